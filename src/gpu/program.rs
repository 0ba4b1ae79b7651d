use std::{path::PathBuf, sync::Arc};

use smallvec::SmallVec;

use crate::rhi::{
    device::{GlDevice, ShaderDevice},
    shader::ShaderError,
    types::{ShaderStage, UniformLocation, UniformValue},
};

use super::context::GlContext;

/// Owning handle to a linked shader program. Uniform upload is only
/// reachable through the `ActiveProgram` token returned by `activate`.
#[derive(Debug)]
pub struct ShaderProgram<D: GlDevice> {
    ctx: Arc<GlContext<D>>,
    raw: D::ProgramName,
}

impl<D: GlDevice> ShaderProgram<D> {
    #[inline]
    pub fn raw(&self) -> D::ProgramName {
        self.raw
    }

    pub fn activate(&self) -> ActiveProgram<'_, D> {
        self.ctx.device().use_program(Some(self.raw));
        ActiveProgram { program: self }
    }
}

impl<D: GlDevice> Drop for ShaderProgram<D> {
    fn drop(&mut self) {
        self.ctx.device().delete_program(self.raw);
    }
}

/// Program bound for use; uniform setters are chainable and silently skip
/// uniforms the linker optimized out.
pub struct ActiveProgram<'a, D: GlDevice> {
    program: &'a ShaderProgram<D>,
}

impl<D: GlDevice> ActiveProgram<'_, D> {
    pub fn uniform(&self, name: &str, value: impl Into<UniformValue>) -> &Self {
        let device = self.program.ctx.device();
        if let Some(location) = device.uniform_location(self.program.raw, name) {
            device.set_uniform(location, value.into());
        }
        self
    }

    pub fn location_of(&self, name: &str) -> Option<UniformLocation> {
        self.program
            .ctx
            .device()
            .uniform_location(self.program.raw, name)
    }

    pub fn uniform_at(&self, location: UniformLocation, value: impl Into<UniformValue>) -> &Self {
        self.program.ctx.device().set_uniform(location, value.into());
        self
    }
}

impl<D: GlDevice> Drop for ActiveProgram<'_, D> {
    fn drop(&mut self) {
        self.program.ctx.device().use_program(None);
    }
}

/// Assembles a program from shader source files on disk, with optional
/// `#define`s injected right after the `#version` directive.
#[derive(Clone, Debug, Default)]
pub struct ShaderBuilder {
    stages: SmallVec<[(ShaderStage, PathBuf); 3]>,
    defines: Vec<String>,
}

impl ShaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_vert(mut self, path: impl Into<PathBuf>) -> Self {
        self.stages.push((ShaderStage::Vertex, path.into()));
        self
    }

    pub fn load_frag(mut self, path: impl Into<PathBuf>) -> Self {
        self.stages.push((ShaderStage::Fragment, path.into()));
        self
    }

    pub fn load_geom(mut self, path: impl Into<PathBuf>) -> Self {
        self.stages.push((ShaderStage::Geometry, path.into()));
        self
    }

    pub fn load_comp(mut self, path: impl Into<PathBuf>) -> Self {
        self.stages.push((ShaderStage::Compute, path.into()));
        self
    }

    pub fn define(mut self, name: impl Into<String>) -> Self {
        self.defines.push(name.into());
        self
    }

    pub fn build<D: GlDevice>(
        self,
        ctx: &Arc<GlContext<D>>,
    ) -> Result<ShaderProgram<D>, ShaderError> {
        let device = ctx.device();
        let mut shaders = SmallVec::<[D::ShaderName; 3]>::new();

        let cleanup = |shaders: &[D::ShaderName]| {
            for shader in shaders {
                device.delete_shader(*shader);
            }
        };

        for (stage, path) in &self.stages {
            let source = std::fs::read_to_string(path).map_err(|source| ShaderError::Io {
                path: path.clone(),
                source,
            })?;
            let source = inject_defines(&source, &self.defines);
            match device.compile_shader(*stage, &source) {
                Ok(shader) => shaders.push(shader),
                Err(err) => {
                    cleanup(&shaders);
                    return Err(err);
                }
            }
        }

        let program = device.link_program(&shaders);
        cleanup(&shaders);

        Ok(ShaderProgram {
            ctx: Arc::clone(ctx),
            raw: program?,
        })
    }
}

fn inject_defines(source: &str, defines: &[String]) -> String {
    if defines.is_empty() {
        return source.to_owned();
    }

    let define_block: String = defines
        .iter()
        .map(|name| format!("#define {name}\n"))
        .collect();

    match source.find('\n') {
        // The #version directive must stay the first line.
        Some(line_end) if source.trim_start().starts_with("#version") => {
            let (first, rest) = source.split_at(line_end + 1);
            format!("{first}{define_block}{rest}")
        }
        _ => format!("{define_block}{source}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::headless::HeadlessDevice;

    #[test]
    fn missing_source_file_is_an_io_error() {
        let ctx = GlContext::new(HeadlessDevice::new());
        let result = ShaderBuilder::new()
            .load_vert("shaders/does_not_exist.vert")
            .build(&ctx);

        assert!(matches!(result, Err(ShaderError::Io { .. })));
    }

    #[test]
    fn defines_land_after_version_directive() {
        let source = "#version 430 core\nvoid main() {}\n";
        let injected = inject_defines(source, &["ENABLE_ALPHA_TESTING".to_owned()]);

        let lines: Vec<&str> = injected.lines().collect();
        assert_eq!(lines[0], "#version 430 core");
        assert_eq!(lines[1], "#define ENABLE_ALPHA_TESTING");
    }

    #[test]
    fn defines_prepend_without_version() {
        let injected = inject_defines("void main() {}\n", &["X".to_owned()]);
        assert!(injected.starts_with("#define X\n"));
    }
}
