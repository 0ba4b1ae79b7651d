use std::collections::HashMap;

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::collections::{
    handle::{Handle, HandleAllocator},
    sparse_array::SparseArray,
};

use super::{
    device::{CommandDevice, ResourceDevice, ShaderDevice},
    resources::{
        AttachmentPoint, BufferUsage, FramebufferStatus, FramebufferTarget, SamplerParams,
        TextureDesc, VertexLayout,
    },
    shader::ShaderError,
    types::{
        BarrierMask, Capability, ClearMask, Filter, Format, Region2D, ShaderStage, UniformLocation,
        UniformValue,
    },
};

pub mod marks {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Buffer;
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Texture;
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Renderbuffer;
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Framebuffer;
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct VertexArray;
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Shader;
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Program;
}

pub type BufferName = Handle<marks::Buffer>;
pub type TextureName = Handle<marks::Texture>;
pub type RenderbufferName = Handle<marks::Renderbuffer>;
pub type FramebufferName = Handle<marks::Framebuffer>;
pub type VertexArrayName = Handle<marks::VertexArray>;
pub type ShaderName = Handle<marks::Shader>;
pub type ProgramName = Handle<marks::Program>;

#[derive(Debug)]
struct BufferState {
    bytes: Vec<u8>,
    usage: BufferUsage,
}

#[derive(Debug)]
struct TextureState {
    desc: TextureDesc,
    params: SamplerParams,
    pixels: Option<Vec<u8>>,
}

#[derive(Debug)]
struct RenderbufferState {
    format: Format,
    extent: [u32; 2],
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Attachment {
    Texture(TextureName),
    Renderbuffer(RenderbufferName),
}

#[derive(Debug, Default)]
struct FramebufferState {
    attachments: SmallVec<[(AttachmentPoint, Attachment); 4]>,
    draw_buffers: SmallVec<[u32; 4]>,
}

#[derive(Debug)]
struct VertexArrayState {
    #[allow(dead_code)]
    vertex_buffer: BufferName,
    #[allow(dead_code)]
    index_buffer: BufferName,
    #[allow(dead_code)]
    stride: u32,
}

#[derive(Debug)]
struct ShaderState {
    #[allow(dead_code)]
    stage: ShaderStage,
}

#[derive(Debug, Default)]
struct ProgramState {
    locations: HashMap<String, UniformLocation>,
    values: HashMap<i32, UniformValue>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub draw_calls: u32,
    pub dispatches: u32,
    pub barriers: u32,
    pub clears: u32,
    pub blits: u32,
    pub buffer_uploads: u32,
    pub buffer_sub_uploads: u32,
}

#[derive(Debug)]
struct BindState {
    draw_framebuffer: Option<FramebufferName>,
    read_framebuffer: Option<FramebufferName>,
    program: Option<ProgramName>,
    clear_color: [f32; 4],
    viewport: Region2D,
    capabilities: HashMap<Capability, bool>,
    texture_units: HashMap<u32, TextureName>,
    storage_bindings: HashMap<u32, BufferName>,
}

impl Default for BindState {
    fn default() -> Self {
        Self {
            draw_framebuffer: None,
            read_framebuffer: None,
            program: None,
            clear_color: [0.0; 4],
            viewport: Region2D::with_extent(0, 0),
            capabilities: HashMap::new(),
            texture_units: HashMap::new(),
            storage_bindings: HashMap::new(),
        }
    }
}

#[derive(Debug, Default)]
struct DeviceState {
    buffer_names: HandleAllocator<marks::Buffer>,
    buffers: SparseArray<marks::Buffer, BufferState>,
    texture_names: HandleAllocator<marks::Texture>,
    textures: SparseArray<marks::Texture, TextureState>,
    renderbuffer_names: HandleAllocator<marks::Renderbuffer>,
    renderbuffers: SparseArray<marks::Renderbuffer, RenderbufferState>,
    framebuffer_names: HandleAllocator<marks::Framebuffer>,
    framebuffers: SparseArray<marks::Framebuffer, FramebufferState>,
    vertex_array_names: HandleAllocator<marks::VertexArray>,
    vertex_arrays: SparseArray<marks::VertexArray, VertexArrayState>,
    shader_names: HandleAllocator<marks::Shader>,
    shaders: SparseArray<marks::Shader, ShaderState>,
    program_names: HandleAllocator<marks::Program>,
    programs: SparseArray<marks::Program, ProgramState>,

    bind: BindState,
    stats: DeviceStats,
    errors: Vec<String>,
    next_uniform_location: i32,
}

/// In-memory device: every verb of the device contract is tracked against
/// real object tables, buffer contents are stored byte-for-byte (so SSBO
/// staging and compute readback round-trips are observable), and invalid
/// operations (draws or clears against incomplete framebuffers, stale
/// names) are recorded as errors instead of UB.
///
/// This is what the frame driver binary and the test suite run against; a
/// production build implements the same traits over a real GL context.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    state: Mutex<DeviceState>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> DeviceStats {
        self.state.lock().stats
    }

    pub fn reset_stats(&self) {
        self.state.lock().stats = DeviceStats::default();
    }

    /// Errors recorded since the last call; empty on a well-behaved frame.
    pub fn take_errors(&self) -> Vec<String> {
        std::mem::take(&mut self.state.lock().errors)
    }

    pub fn buffer_bytes(&self, buffer: BufferName) -> Option<Vec<u8>> {
        self.state
            .lock()
            .buffers
            .get(buffer)
            .map(|b| b.bytes.clone())
    }

    pub fn texture_desc(&self, texture: TextureName) -> Option<TextureDesc> {
        self.state.lock().textures.get(texture).map(|t| t.desc.clone())
    }

    pub fn texture_sampler_params(&self, texture: TextureName) -> Option<SamplerParams> {
        self.state.lock().textures.get(texture).map(|t| t.params)
    }

    pub fn texture_pixel_bytes(&self, texture: TextureName) -> Option<Vec<u8>> {
        self.state
            .lock()
            .textures
            .get(texture)
            .and_then(|t| t.pixels.clone())
    }

    pub fn uniform_value(&self, program: ProgramName, name: &str) -> Option<UniformValue> {
        let state = self.state.lock();
        let program = state.programs.get(program)?;
        let location = program.locations.get(name)?;
        program.values.get(&location.0).copied()
    }

    pub fn bound_texture(&self, unit: u32) -> Option<TextureName> {
        self.state.lock().bind.texture_units.get(&unit).copied()
    }

    pub fn storage_binding(&self, index: u32) -> Option<BufferName> {
        self.state.lock().bind.storage_bindings.get(&index).copied()
    }

    pub fn bound_draw_framebuffer(&self) -> Option<FramebufferName> {
        self.state.lock().bind.draw_framebuffer
    }

    pub fn viewport_region(&self) -> Region2D {
        self.state.lock().bind.viewport
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.state.lock().bind.clear_color
    }

    pub fn capability_enabled(&self, capability: Capability) -> bool {
        self.state
            .lock()
            .bind
            .capabilities
            .get(&capability)
            .copied()
            .unwrap_or(false)
    }

    pub fn buffer_usage(&self, buffer: BufferName) -> Option<BufferUsage> {
        self.state.lock().buffers.get(buffer).map(|b| b.usage)
    }

    pub fn renderbuffer_shape(&self, renderbuffer: RenderbufferName) -> Option<(Format, [u32; 2])> {
        self.state
            .lock()
            .renderbuffers
            .get(renderbuffer)
            .map(|rb| (rb.format, rb.extent))
    }

    pub fn framebuffer_draw_buffers(&self, framebuffer: FramebufferName) -> Option<Vec<u32>> {
        self.state
            .lock()
            .framebuffers
            .get(framebuffer)
            .map(|fb| fb.draw_buffers.to_vec())
    }

    pub fn live_textures(&self) -> usize {
        self.state.lock().textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.lock().buffers.len()
    }

    fn record_error(state: &mut DeviceState, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(target: "lumen::headless", "{message}");
        state.errors.push(message);
    }

    fn status_of(state: &DeviceState, framebuffer: FramebufferName) -> FramebufferStatus {
        let Some(fb) = state.framebuffers.get(framebuffer) else {
            return FramebufferStatus::MissingAttachment;
        };
        if fb.attachments.is_empty() {
            return FramebufferStatus::MissingAttachment;
        }
        for (_, attachment) in &fb.attachments {
            match attachment {
                Attachment::Texture(tex) => {
                    let Some(tex) = state.textures.get(*tex) else {
                        return FramebufferStatus::IncompleteAttachment;
                    };
                    let desc = &tex.desc;
                    if desc.width() == 0 || desc.height() == 0 || desc.image_count() == 0 {
                        return FramebufferStatus::IncompleteAttachment;
                    }
                }
                Attachment::Renderbuffer(rb) => {
                    let Some(rb) = state.renderbuffers.get(*rb) else {
                        return FramebufferStatus::IncompleteAttachment;
                    };
                    if rb.extent[0] == 0 || rb.extent[1] == 0 {
                        return FramebufferStatus::IncompleteAttachment;
                    }
                }
            }
        }
        FramebufferStatus::Complete
    }

    fn draw_target_ready(state: &mut DeviceState, what: &str) -> bool {
        if let Some(fb) = state.bind.draw_framebuffer {
            let status = Self::status_of(state, fb);
            if status != FramebufferStatus::Complete {
                Self::record_error(
                    state,
                    format!("{what} against incomplete draw framebuffer ({status:?})"),
                );
                return false;
            }
        }
        true
    }
}

impl ResourceDevice for HeadlessDevice {
    type BufferName = BufferName;
    type TextureName = TextureName;
    type RenderbufferName = RenderbufferName;
    type FramebufferName = FramebufferName;
    type VertexArrayName = VertexArrayName;

    fn create_buffer(&self) -> BufferName {
        let mut state = self.state.lock();
        let name = state.buffer_names.allocate();
        state.buffers.set(
            name,
            BufferState {
                bytes: Vec::new(),
                usage: BufferUsage::StaticDraw,
            },
        );
        name
    }

    fn delete_buffer(&self, buffer: BufferName) {
        let mut state = self.state.lock();
        if state.buffers.remove(buffer).is_none() {
            Self::record_error(&mut state, format!("delete of unknown buffer {buffer:?}"));
        }
        state.buffer_names.free(buffer);
    }

    fn buffer_data(&self, buffer: BufferName, data: &[u8], usage: BufferUsage) {
        let mut state = self.state.lock();
        state.stats.buffer_uploads += 1;
        match state.buffers.get_mut(buffer) {
            Some(b) => {
                b.bytes = data.to_vec();
                b.usage = usage;
            }
            None => Self::record_error(&mut state, format!("buffer_data on unknown {buffer:?}")),
        }
    }

    fn buffer_storage(&self, buffer: BufferName, len: usize, usage: BufferUsage) {
        let mut state = self.state.lock();
        match state.buffers.get_mut(buffer) {
            Some(b) => {
                b.bytes = vec![0; len];
                b.usage = usage;
            }
            None => Self::record_error(&mut state, format!("buffer_storage on unknown {buffer:?}")),
        }
    }

    fn buffer_sub_data(&self, buffer: BufferName, offset: usize, data: &[u8]) {
        let mut state = self.state.lock();
        state.stats.buffer_sub_uploads += 1;
        match state.buffers.get_mut(buffer) {
            Some(b) if offset + data.len() <= b.bytes.len() => {
                b.bytes[offset..offset + data.len()].copy_from_slice(data);
            }
            Some(b) => {
                let have = b.bytes.len();
                Self::record_error(
                    &mut state,
                    format!(
                        "buffer_sub_data out of range on {buffer:?}: offset {offset} + {} > {have}",
                        data.len()
                    ),
                );
            }
            None => {
                Self::record_error(&mut state, format!("buffer_sub_data on unknown {buffer:?}"))
            }
        }
    }

    fn read_buffer(&self, buffer: BufferName, offset: usize, out: &mut [u8]) {
        let mut state = self.state.lock();
        match state.buffers.get(buffer) {
            Some(b) if offset + out.len() <= b.bytes.len() => {
                out.copy_from_slice(&b.bytes[offset..offset + out.len()]);
            }
            Some(_) => {
                out.fill(0);
                Self::record_error(&mut state, format!("read_buffer out of range on {buffer:?}"));
            }
            None => {
                out.fill(0);
                Self::record_error(&mut state, format!("read_buffer on unknown {buffer:?}"));
            }
        }
    }

    fn buffer_len(&self, buffer: BufferName) -> usize {
        self.state
            .lock()
            .buffers
            .get(buffer)
            .map_or(0, |b| b.bytes.len())
    }

    fn bind_buffer_base(&self, index: u32, buffer: BufferName) {
        let mut state = self.state.lock();
        if !state.buffers.contains(buffer) {
            Self::record_error(&mut state, format!("bind_buffer_base on unknown {buffer:?}"));
            return;
        }
        state.bind.storage_bindings.insert(index, buffer);
    }

    fn create_texture(&self, desc: &TextureDesc) -> TextureName {
        let mut state = self.state.lock();
        let name = state.texture_names.allocate();
        state.textures.set(
            name,
            TextureState {
                desc: desc.clone(),
                params: SamplerParams::default(),
                pixels: None,
            },
        );
        name
    }

    fn delete_texture(&self, texture: TextureName) {
        let mut state = self.state.lock();
        if state.textures.remove(texture).is_none() {
            Self::record_error(&mut state, format!("delete of unknown texture {texture:?}"));
        }
        state.texture_names.free(texture);
    }

    fn texture_storage(&self, texture: TextureName, desc: &TextureDesc) {
        let mut state = self.state.lock();
        match state.textures.get_mut(texture) {
            Some(t) => t.desc = desc.clone(),
            None => {
                Self::record_error(&mut state, format!("texture_storage on unknown {texture:?}"))
            }
        }
    }

    fn texture_pixels(&self, texture: TextureName, data: &[u8]) {
        let mut state = self.state.lock();
        match state.textures.get_mut(texture) {
            Some(t) => t.pixels = Some(data.to_vec()),
            None => {
                Self::record_error(&mut state, format!("texture_pixels on unknown {texture:?}"))
            }
        }
    }

    fn sampler_params(&self, texture: TextureName, params: &SamplerParams) {
        let mut state = self.state.lock();
        match state.textures.get_mut(texture) {
            Some(t) => t.params = *params,
            None => {
                Self::record_error(&mut state, format!("sampler_params on unknown {texture:?}"))
            }
        }
    }

    fn bind_texture_unit(&self, unit: u32, texture: TextureName) {
        let mut state = self.state.lock();
        if !state.textures.contains(texture) {
            Self::record_error(&mut state, format!("bind of unknown texture {texture:?}"));
            return;
        }
        state.bind.texture_units.insert(unit, texture);
    }

    fn create_renderbuffer(&self) -> RenderbufferName {
        let mut state = self.state.lock();
        let name = state.renderbuffer_names.allocate();
        state.renderbuffers.set(
            name,
            RenderbufferState {
                format: Format::Depth24,
                extent: [0, 0],
            },
        );
        name
    }

    fn delete_renderbuffer(&self, renderbuffer: RenderbufferName) {
        let mut state = self.state.lock();
        if state.renderbuffers.remove(renderbuffer).is_none() {
            Self::record_error(
                &mut state,
                format!("delete of unknown renderbuffer {renderbuffer:?}"),
            );
        }
        state.renderbuffer_names.free(renderbuffer);
    }

    fn renderbuffer_storage(&self, renderbuffer: RenderbufferName, format: Format, extent: [u32; 2]) {
        let mut state = self.state.lock();
        match state.renderbuffers.get_mut(renderbuffer) {
            Some(rb) => {
                rb.format = format;
                rb.extent = extent;
            }
            None => Self::record_error(
                &mut state,
                format!("renderbuffer_storage on unknown {renderbuffer:?}"),
            ),
        }
    }

    fn create_framebuffer(&self) -> FramebufferName {
        let mut state = self.state.lock();
        let name = state.framebuffer_names.allocate();
        state.framebuffers.set(name, FramebufferState::default());
        name
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferName) {
        let mut state = self.state.lock();
        if state.framebuffers.remove(framebuffer).is_none() {
            Self::record_error(
                &mut state,
                format!("delete of unknown framebuffer {framebuffer:?}"),
            );
        }
        state.framebuffer_names.free(framebuffer);
        if state.bind.draw_framebuffer == Some(framebuffer) {
            state.bind.draw_framebuffer = None;
        }
        if state.bind.read_framebuffer == Some(framebuffer) {
            state.bind.read_framebuffer = None;
        }
    }

    fn attach_texture(
        &self,
        framebuffer: FramebufferName,
        point: AttachmentPoint,
        texture: TextureName,
    ) {
        let mut state = self.state.lock();
        if !state.textures.contains(texture) {
            Self::record_error(&mut state, format!("attach of unknown texture {texture:?}"));
            return;
        }
        match state.framebuffers.get_mut(framebuffer) {
            Some(fb) => {
                fb.attachments.retain(|(p, _)| *p != point);
                fb.attachments.push((point, Attachment::Texture(texture)));
            }
            None => Self::record_error(
                &mut state,
                format!("attach_texture on unknown {framebuffer:?}"),
            ),
        }
    }

    fn attach_renderbuffer(
        &self,
        framebuffer: FramebufferName,
        point: AttachmentPoint,
        renderbuffer: RenderbufferName,
    ) {
        let mut state = self.state.lock();
        if !state.renderbuffers.contains(renderbuffer) {
            Self::record_error(
                &mut state,
                format!("attach of unknown renderbuffer {renderbuffer:?}"),
            );
            return;
        }
        match state.framebuffers.get_mut(framebuffer) {
            Some(fb) => {
                fb.attachments.retain(|(p, _)| *p != point);
                fb.attachments
                    .push((point, Attachment::Renderbuffer(renderbuffer)));
            }
            None => Self::record_error(
                &mut state,
                format!("attach_renderbuffer on unknown {framebuffer:?}"),
            ),
        }
    }

    fn draw_buffers(&self, framebuffer: FramebufferName, color_attachments: &[u32]) {
        let mut state = self.state.lock();
        match state.framebuffers.get_mut(framebuffer) {
            Some(fb) => fb.draw_buffers = color_attachments.iter().copied().collect(),
            None => Self::record_error(
                &mut state,
                format!("draw_buffers on unknown {framebuffer:?}"),
            ),
        }
    }

    fn framebuffer_status(&self, framebuffer: FramebufferName) -> FramebufferStatus {
        Self::status_of(&self.state.lock(), framebuffer)
    }

    fn create_vertex_array(
        &self,
        vertex_buffer: BufferName,
        index_buffer: BufferName,
        layout: &VertexLayout<'_>,
    ) -> VertexArrayName {
        let mut state = self.state.lock();
        if !state.buffers.contains(vertex_buffer) || !state.buffers.contains(index_buffer) {
            Self::record_error(&mut state, "vertex array over unknown buffers");
        }
        let name = state.vertex_array_names.allocate();
        state.vertex_arrays.set(
            name,
            VertexArrayState {
                vertex_buffer,
                index_buffer,
                stride: layout.stride,
            },
        );
        name
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayName) {
        let mut state = self.state.lock();
        if state.vertex_arrays.remove(vertex_array).is_none() {
            Self::record_error(
                &mut state,
                format!("delete of unknown vertex array {vertex_array:?}"),
            );
        }
        state.vertex_array_names.free(vertex_array);
    }
}

impl CommandDevice for HeadlessDevice {
    fn bind_framebuffer(&self, target: FramebufferTarget, framebuffer: Option<FramebufferName>) {
        let mut state = self.state.lock();
        if let Some(fb) = framebuffer {
            if !state.framebuffers.contains(fb) {
                Self::record_error(&mut state, format!("bind of unknown framebuffer {fb:?}"));
                return;
            }
        }
        match target {
            FramebufferTarget::Draw => state.bind.draw_framebuffer = framebuffer,
            FramebufferTarget::Read => state.bind.read_framebuffer = framebuffer,
        }
    }

    fn viewport(&self, region: Region2D) {
        self.state.lock().bind.viewport = region;
    }

    fn set_clear_color(&self, rgba: [f32; 4]) {
        self.state.lock().bind.clear_color = rgba;
    }

    fn clear(&self, _mask: ClearMask) {
        let mut state = self.state.lock();
        if Self::draw_target_ready(&mut state, "clear") {
            state.stats.clears += 1;
        }
    }

    fn set_capability(&self, capability: Capability, enabled: bool) {
        self.state.lock().bind.capabilities.insert(capability, enabled);
    }

    fn draw_indexed(&self, vertex_array: VertexArrayName, _index_count: u32) {
        let mut state = self.state.lock();
        if !state.vertex_arrays.contains(vertex_array) {
            Self::record_error(
                &mut state,
                format!("draw with unknown vertex array {vertex_array:?}"),
            );
            return;
        }
        if state.bind.program.is_none() {
            Self::record_error(&mut state, "draw without a program in use");
            return;
        }
        if Self::draw_target_ready(&mut state, "draw") {
            state.stats.draw_calls += 1;
        }
    }

    fn draw_arrays(&self, vertex_array: VertexArrayName, _vertex_count: u32) {
        self.draw_indexed(vertex_array, 0);
    }

    fn dispatch_compute(&self, _groups: [u32; 3]) {
        let mut state = self.state.lock();
        if state.bind.program.is_none() {
            Self::record_error(&mut state, "dispatch without a program in use");
            return;
        }
        state.stats.dispatches += 1;
    }

    fn memory_barrier(&self, _mask: BarrierMask) {
        self.state.lock().stats.barriers += 1;
    }

    fn blit_framebuffer(&self, _src: Region2D, _dst: Region2D, _mask: ClearMask, _filter: Filter) {
        let mut state = self.state.lock();
        if let Some(fb) = state.bind.read_framebuffer {
            if Self::status_of(&state, fb) != FramebufferStatus::Complete {
                Self::record_error(&mut state, "blit from incomplete read framebuffer");
                return;
            }
        }
        if Self::draw_target_ready(&mut state, "blit") {
            state.stats.blits += 1;
        }
    }
}

impl ShaderDevice for HeadlessDevice {
    type ShaderName = ShaderName;
    type ProgramName = ProgramName;

    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<ShaderName, ShaderError> {
        if source.trim().is_empty() {
            return Err(ShaderError::Compile {
                stage,
                log: "empty shader source".into(),
            });
        }
        let mut state = self.state.lock();
        let name = state.shader_names.allocate();
        state.shaders.set(name, ShaderState { stage });
        Ok(name)
    }

    fn delete_shader(&self, shader: ShaderName) {
        let mut state = self.state.lock();
        state.shaders.remove(shader);
        state.shader_names.free(shader);
    }

    fn link_program(&self, shaders: &[ShaderName]) -> Result<ProgramName, ShaderError> {
        let mut state = self.state.lock();
        if shaders.is_empty() {
            return Err(ShaderError::Link {
                log: "no shaders attached".into(),
            });
        }
        for shader in shaders {
            if !state.shaders.contains(*shader) {
                return Err(ShaderError::Link {
                    log: format!("unknown shader object {shader:?}"),
                });
            }
        }
        let name = state.program_names.allocate();
        state.programs.set(name, ProgramState::default());
        Ok(name)
    }

    fn delete_program(&self, program: ProgramName) {
        let mut state = self.state.lock();
        state.programs.remove(program);
        state.program_names.free(program);
        if state.bind.program == Some(program) {
            state.bind.program = None;
        }
    }

    fn use_program(&self, program: Option<ProgramName>) {
        let mut state = self.state.lock();
        if let Some(p) = program {
            if !state.programs.contains(p) {
                Self::record_error(&mut state, format!("use of unknown program {p:?}"));
                return;
            }
        }
        state.bind.program = program;
    }

    fn uniform_location(&self, program: ProgramName, name: &str) -> Option<UniformLocation> {
        let mut state = self.state.lock();
        let next = state.next_uniform_location;

        let program_state = state.programs.get_mut(program)?;
        if let Some(location) = program_state.locations.get(name) {
            return Some(*location);
        }

        // Locations are spaced out so that array indexing via offset() never
        // collides with a neighbouring uniform.
        let location = UniformLocation(next);
        program_state.locations.insert(name.to_owned(), location);
        state.next_uniform_location = next + 64;
        Some(location)
    }

    fn set_uniform(&self, location: UniformLocation, value: UniformValue) {
        let mut state = self.state.lock();
        let Some(program) = state.bind.program else {
            Self::record_error(&mut state, "set_uniform without a program in use");
            return;
        };
        match state.programs.get_mut(program) {
            Some(p) => {
                p.values.insert(location.0, value);
            }
            None => Self::record_error(&mut state, "set_uniform on a deleted program"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_round_trip() {
        let device = HeadlessDevice::new();
        let buffer = device.create_buffer();
        device.buffer_data(buffer, &[1, 2, 3, 4], BufferUsage::DynamicDraw);
        device.buffer_sub_data(buffer, 2, &[9, 9]);

        let mut out = [0u8; 4];
        device.read_buffer(buffer, 0, &mut out);
        assert_eq!(out, [1, 2, 9, 9]);
        assert_eq!(device.buffer_len(buffer), 4);
        assert!(device.take_errors().is_empty());
    }

    #[test]
    fn zero_layer_attachment_is_incomplete() {
        let device = HeadlessDevice::new();
        let texture =
            device.create_texture(&TextureDesc::new_cubemap_array([64, 64], 0, Format::Depth24));
        let framebuffer = device.create_framebuffer();
        device.attach_texture(framebuffer, AttachmentPoint::Depth, texture);

        assert_eq!(
            device.framebuffer_status(framebuffer),
            FramebufferStatus::IncompleteAttachment
        );

        device.texture_storage(
            texture,
            &TextureDesc::new_cubemap_array([64, 64], 2, Format::Depth24),
        );
        assert_eq!(
            device.framebuffer_status(framebuffer),
            FramebufferStatus::Complete
        );
    }

    #[test]
    fn clear_on_incomplete_framebuffer_records_error() {
        let device = HeadlessDevice::new();
        let framebuffer = device.create_framebuffer();
        device.bind_framebuffer(FramebufferTarget::Draw, Some(framebuffer));
        device.clear(ClearMask::Depth);

        assert_eq!(device.stats().clears, 0);
        assert_eq!(device.take_errors().len(), 1);
    }

    #[test]
    fn uniforms_are_stored_per_program() {
        let device = HeadlessDevice::new();
        let vs = device.compile_shader(ShaderStage::Vertex, "void main() {}").unwrap();
        let program = device.link_program(&[vs]).unwrap();

        device.use_program(Some(program));
        let location = device.uniform_location(program, "exposure").unwrap();
        device.set_uniform(location, UniformValue::F32(0.5));

        assert_eq!(
            device.uniform_value(program, "exposure"),
            Some(UniformValue::F32(0.5))
        );
    }
}
