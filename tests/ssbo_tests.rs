//! SSBO-with-staging contract:
//! - update() reallocates on size change and sub-uploads otherwise
//! - host staging mirrors the uploaded range in order
//! - create_storage()/read_to_storage() round-trip for compute readback

use lumen::{
    GlContext, HeadlessDevice,
    gpu::ssbo::SsboWithStaging,
    rhi::resources::BufferUsage,
};

#[test]
fn update_fills_storage_in_iteration_order() {
    let ctx = GlContext::new(HeadlessDevice::new());
    let mut ssbo = SsboWithStaging::<u32, _>::new(&ctx, 1, BufferUsage::DynamicDraw);

    ssbo.bind().update([3u32, 1, 4, 1, 5]);

    assert_eq!(ssbo.storage(), &[3, 1, 4, 1, 5]);
    assert_eq!(ssbo.buffer().byte_len(), 5 * size_of::<u32>());
}

#[test]
fn same_size_update_uses_sub_upload() {
    let ctx = GlContext::new(HeadlessDevice::new());
    let mut ssbo = SsboWithStaging::<u32, _>::new(&ctx, 1, BufferUsage::DynamicDraw);

    ssbo.bind().update([1u32, 2, 3]);
    let after_first = ctx.device().stats();

    ssbo.bind().update([4u32, 5, 6]);
    let after_second = ctx.device().stats();

    // Second upload of the same element count must not reallocate.
    assert_eq!(after_second.buffer_uploads, after_first.buffer_uploads);
    assert_eq!(
        after_second.buffer_sub_uploads,
        after_first.buffer_sub_uploads + 1
    );

    let bytes = ctx.device().buffer_bytes(ssbo.buffer().raw()).unwrap();
    assert_eq!(bytemuck::pod_collect_to_vec::<u8, u32>(&bytes), vec![4, 5, 6]);
}

#[test]
fn growing_update_reallocates() {
    let ctx = GlContext::new(HeadlessDevice::new());
    let mut ssbo = SsboWithStaging::<u32, _>::new(&ctx, 1, BufferUsage::DynamicDraw);

    // Ten entries on frame N, twelve on frame N+1.
    ssbo.bind().update(0u32..10);
    let after_first = ctx.device().stats();
    assert_eq!(ssbo.buffer().byte_len(), 10 * size_of::<u32>());

    ssbo.bind().update(100u32..112);
    let after_second = ctx.device().stats();

    assert_eq!(after_second.buffer_uploads, after_first.buffer_uploads + 1);
    assert_eq!(ssbo.buffer().byte_len(), 12 * size_of::<u32>());
    assert_eq!(&ssbo.storage()[..10], &[100, 101, 102, 103, 104, 105, 106, 107, 108, 109]);
}

#[test]
fn shrinking_update_reallocates_to_smaller_length() {
    let ctx = GlContext::new(HeadlessDevice::new());
    let mut ssbo = SsboWithStaging::<f32, _>::new(&ctx, 2, BufferUsage::DynamicDraw);

    ssbo.bind().update([1.0f32; 8]);
    ssbo.bind().update([2.0f32; 3]);

    assert_eq!(ssbo.len(), 3);
    assert_eq!(ssbo.buffer().byte_len(), 3 * size_of::<f32>());
}

#[test]
fn create_storage_and_read_back() {
    let ctx = GlContext::new(HeadlessDevice::new());
    let mut ssbo = SsboWithStaging::<f32, _>::new(&ctx, 0, BufferUsage::DynamicRead);

    ssbo.bind().create_storage(16);
    assert_eq!(ssbo.len(), 16);
    assert_eq!(ssbo.buffer().byte_len(), 16 * size_of::<f32>());

    // Simulate a compute shader writing into the SSBO.
    let written: Vec<f32> = (0..16).map(|i| i as f32 * 0.5).collect();
    ssbo.buffer().upload_sub(0, &written);

    ssbo.bind().read_to_storage();
    assert_eq!(ssbo.storage(), written.as_slice());
}

#[test]
fn binding_index_is_applied_on_bind() {
    let ctx = GlContext::new(HeadlessDevice::new());
    let mut ssbo = SsboWithStaging::<u32, _>::new(&ctx, 7, BufferUsage::DynamicDraw);

    ssbo.bind().update([9u32]);
    assert_eq!(ctx.device().storage_binding(7), Some(ssbo.buffer().raw()));
}
