use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};

use sortvis_engine::core::{App, AppControl, FrameCtx};
use sortvis_engine::device::{DeviceError, Gpu, GpuInit, ShaderStage, SurfaceErrorAction};
use sortvis_engine::gl::{
    FrameRenderer, FrameRendererConfig, GlError, Program, Shader, SharedBuffer, VertexBuffer,
    VertexBufferConfig,
};
use sortvis_engine::logging::{init_logging, LoggingConfig};
use sortvis_engine::window::{Runtime, RuntimeConfig};

mod bars;

use bars::Bars;

const BAR_COUNT: usize = 32;
/// Frames between two steps of the animation.
const FRAMES_PER_STEP: u64 = 12;

/// Everything that needs the device to exist.
struct Scene {
    renderer: FrameRenderer,
    positions: SharedBuffer,
    colors: SharedBuffer,
}

struct Studio {
    bars: Bars,
    scene: Option<Scene>,
}

impl Studio {
    fn new() -> Self {
        Self {
            bars: Bars::new(BAR_COUNT),
            scene: None,
        }
    }
}

fn build_scene(gpu: &mut Gpu<'_>) -> Result<Scene> {
    let vs = Shader::new(gpu, ShaderStage::Vertex, include_str!("../shaders/bars.vert.wgsl"))?;
    vs.status().context("bar vertex shader")?;
    let fs = Shader::new(gpu, ShaderStage::Fragment, include_str!("../shaders/bars.frag.wgsl"))?;
    fs.status().context("bar fragment shader")?;

    let program = Program::new(gpu, &[&vs, &fs])?;
    program.status().context("bar program")?;
    vs.release(gpu);
    fs.release(gpu);

    let positions = VertexBuffer::new(
        gpu,
        VertexBufferConfig {
            index: 0,
            size: 2,
            ..Default::default()
        },
    )?;
    let colors = VertexBuffer::new(
        gpu,
        VertexBufferConfig {
            index: 1,
            size: 3,
            ..Default::default()
        },
    )?;
    let positions = Rc::new(RefCell::new(positions));
    let colors = Rc::new(RefCell::new(colors));

    let mut renderer = FrameRenderer::new(&*gpu, FrameRendererConfig::default());
    renderer.attach_program(Rc::new(program));
    renderer.attach_buffer(Rc::clone(&positions));
    renderer.attach_buffer(Rc::clone(&colors));

    Ok(Scene {
        renderer,
        positions,
        colors,
    })
}

impl App for Studio {
    fn on_gpu_ready(&mut self, gpu: &mut Gpu<'_>) -> Result<()> {
        self.scene = Some(build_scene(gpu)?);
        log::info!("bar chart ready ({BAR_COUNT} bars, {:?})", gpu.surface_format());
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(scene) = &self.scene else {
            return AppControl::Continue;
        };

        if ctx.frame_index > 0 && ctx.frame_index % FRAMES_PER_STEP == 0 {
            self.bars.step();
        }

        let (positions, colors) = self.bars.geometry();
        {
            let mut p = scene.positions.borrow_mut();
            p.clear();
            p.push(&positions);
        }
        {
            let mut c = scene.colors.borrow_mut();
            c.clear();
            c.push(&colors);
        }

        match scene.renderer.render(&mut *ctx.gpu) {
            Ok(()) => AppControl::Continue,
            Err(GlError::Device(DeviceError::Surface(action)))
                if action != SurfaceErrorAction::Fatal =>
            {
                log::debug!("frame {} skipped ({action:?})", ctx.frame_index);
                AppControl::Continue
            }
            Err(err) => {
                log::error!("render failed: {err}");
                AppControl::Exit
            }
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "sortvis studio".to_string(),
        initial_size: winit::dpi::LogicalSize::new(960.0, 540.0),
        ..Default::default()
    };
    let gpu_init = GpuInit {
        present_mode: wgpu::PresentMode::AutoVsync,
        ..Default::default()
    };

    Runtime::run(config, gpu_init, Studio::new())
}
