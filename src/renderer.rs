// src/renderer.rs

use std::ops::Range;
use std::path::Path;
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use log::{debug, info, warn};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::canvas::{Canvas, Rect, SourceRect, Texture};
use crate::config::GameConfig;
use crate::error::{GameError, Result};

/// スプライト四角形の頂点（論理座標 + UV）。
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SpriteVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl SpriteVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// 描画待ちのスプライト1枚分。
struct QueuedSprite {
    texture: Rc<TextureHandle>,
    vertices: [SpriteVertex; 4],
}

/// 描画エンジンの中心構造体。WGPU の初期化とスプライトのバッチ描画を担当する。
pub struct Renderer {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface,
    pub config: wgpu::SurfaceConfiguration,

    sprite_pipeline: wgpu::RenderPipeline,
    texture_bind_group_layout: wgpu::BindGroupLayout,

    // ユニフォーム用のバッファとバインドグループ
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,

    clear_color: wgpu::Color,
    queued: Vec<QueuedSprite>,
}

/// テクスチャとサンプラーをまとめた構造体。
/// テクスチャ本体も保持することで、ビューが無効にならないようにする。
pub struct TextureHandle {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

impl Texture for TextureHandle {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Renderer {
    /// Renderer構造体の初期化。
    /// ウィンドウと連携し、WGPUの初期化・パイプライン・バインドレイアウトをセットアップする。
    pub async fn new(window: &Window, game_config: &GameConfig) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        // Safety: サーフェスは GraphicsContext 内でウィンドウより先に破棄される
        let surface = unsafe { instance.create_surface(window) }?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                compatible_surface: Some(&surface),
                ..Default::default()
            })
            .await
            .ok_or(GameError::NoAdapter)?;
        info!(target: "graphics", "using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let surface_format = match caps.formats.iter().copied().find(|f| f.is_srgb()) {
            Some(format) => format,
            None => {
                // 色がくすむだけで描画は可能なので続行する
                warn!(target: "graphics", "no sRGB surface format available, colors may look washed out");
                *caps.formats.first().ok_or(GameError::NoSurfaceFormat)?
            }
        };
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Opaque);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![surface_format],
        };
        surface.configure(&device, &config);
        debug!(target: "graphics", "surface configured: {}x{} {:?}", config.width, config.height, surface_format);

        // バインドグループレイアウト（group 0: uniforms）
        let uniform_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform BindGroup Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_data = surface_scale(game_config, size.width, size.height);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&uniform_data),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform BindGroup"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        // group 1: texture + sampler
        let texture_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture BindGroup Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sprite Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sprite.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sprite Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout, &texture_bind_group_layout],
            push_constant_ranges: &[],
        });

        let sprite_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Sprite Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[SpriteVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Ok(Self {
            device,
            queue,
            surface,
            config,
            sprite_pipeline,
            texture_bind_group_layout,
            uniform_buffer,
            uniform_bind_group,
            clear_color: clear_color(game_config.clear_color, surface_format.is_srgb()),
            queued: Vec::new(),
        })
    }

    /// ウィンドウサイズが変更されたときの処理。
    /// 新しい物理サイズでサーフェスを再構成し、stretch_mode に応じて uniform_buffer を更新する。
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>, game_config: &GameConfig) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);

        let scale = surface_scale(game_config, new_size.width, new_size.height);
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&scale));
        debug!(target: "graphics", "surface resized to {}x{}", new_size.width, new_size.height);
    }

    /// 画像ファイルを読み込み、GPUへ転送して TextureHandle を返す。
    /// ドット絵がぼやけないよう最近傍補間のサンプラーを使う。
    pub fn load_texture(&self, path: &Path) -> Result<TextureHandle> {
        let img = image::open(path)
            .map_err(|source| GameError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        let (width, height) = img.dimensions();
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: path.to_str(),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &img,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
            label: Some("Texture BindGroup"),
        });

        debug!(target: "graphics", "loaded texture {} ({}x{})", path.display(), width, height);
        Ok(TextureHandle {
            texture,
            view,
            sampler,
            bind_group,
            width,
            height,
        })
    }

    /// キューに溜まったスプライトを1つのレンダーパスで描画し、画面に表示する。
    fn draw_queued(&mut self) -> Result<()> {
        let output = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!(target: "graphics", "surface lost, reconfiguring and skipping frame");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!(target: "graphics", "timed out acquiring frame, skipping");
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(GameError::OutOfMemory),
        };

        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Frame Encoder") });

        let vertices: Vec<SpriteVertex> = self.queued.iter().flat_map(|s| s.vertices).collect();
        let indices = quad_indices(self.queued.len());
        let runs = texture_runs(self.queued.iter().map(|s| &s.texture));
        let buffers = (!self.queued.is_empty()).then(|| {
            let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Sprite Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Sprite Index Buffer"),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            (vertex_buffer, index_buffer)
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Sprite Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            if let Some((vertex_buffer, index_buffer)) = &buffers {
                pass.set_pipeline(&self.sprite_pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                pass.set_vertex_buffer(0, vertex_buffer.slice(..));
                pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);

                // 同じテクスチャが続く範囲はまとめて1回で描画する
                for run in &runs {
                    pass.set_bind_group(1, &self.queued[run.start].texture.bind_group, &[]);
                    pass.draw_indexed((run.start * 6) as u32..(run.end * 6) as u32, 0, 0..1);
                }
            }
        }

        self.queue.submit(Some(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl Canvas for Renderer {
    type Texture = TextureHandle;

    fn clear(&mut self) {
        self.queued.clear();
    }

    fn blit(&mut self, texture: &Rc<TextureHandle>, src: SourceRect, dst: Rect) {
        self.queued.push(QueuedSprite {
            texture: Rc::clone(texture),
            vertices: quad_vertices(src, texture.size(), dst),
        });
    }

    fn present(&mut self) -> Result<()> {
        let result = self.draw_queued();
        self.queued.clear();
        result
    }
}

/// 描画座標を NDC に変換する uniform のスケール値を求める。
pub fn surface_scale(config: &GameConfig, physical_width: u32, physical_height: u32) -> [f32; 4] {
    let (width, height) = if config.stretch_mode {
        (physical_width.max(1), physical_height.max(1))
    } else {
        (config.logical_width, config.logical_height)
    };
    [2.0 / width as f32, 2.0 / height as f32, 0.0, 0.0]
}

/// 0-255 の sRGB 色を wgpu のクリア色に変換する。sRGB サーフェスでは線形値が要る。
pub fn clear_color(rgb: [u8; 3], srgb_target: bool) -> wgpu::Color {
    let channel = |c: u8| {
        let c = c as f64 / 255.0;
        if !srgb_target {
            c
        } else if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    wgpu::Color {
        r: channel(rgb[0]),
        g: channel(rgb[1]),
        b: channel(rgb[2]),
        a: 1.0,
    }
}

/// テクスチャの src 領域を dst に貼る四角形の頂点（左上から時計回り）。
pub fn quad_vertices(src: SourceRect, texture_size: (u32, u32), dst: Rect) -> [SpriteVertex; 4] {
    let (tw, th) = (texture_size.0.max(1) as f32, texture_size.1.max(1) as f32);
    let u0 = src.x as f32 / tw;
    let v0 = src.y as f32 / th;
    let u1 = (src.x + src.w) as f32 / tw;
    let v1 = (src.y + src.h) as f32 / th;
    [
        SpriteVertex { position: [dst.x, dst.y], uv: [u0, v0] },
        SpriteVertex { position: [dst.x + dst.w, dst.y], uv: [u1, v0] },
        SpriteVertex { position: [dst.x + dst.w, dst.y + dst.h], uv: [u1, v1] },
        SpriteVertex { position: [dst.x, dst.y + dst.h], uv: [u0, v1] },
    ]
}

/// 四角形 count 個分のインデックス。
pub fn quad_indices(count: usize) -> Vec<u32> {
    (0..count as u32)
        .flat_map(|i| {
            let base = i * 4;
            [base, base + 1, base + 2, base + 2, base + 3, base]
        })
        .collect()
}

/// 同じテクスチャが連続する範囲に分割する。
pub fn texture_runs<'a, T: 'a>(textures: impl IntoIterator<Item = &'a Rc<T>>) -> Vec<Range<usize>> {
    let mut runs: Vec<Range<usize>> = Vec::new();
    let mut previous: Option<&Rc<T>> = None;
    for (i, texture) in textures.into_iter().enumerate() {
        match (previous, runs.last_mut()) {
            (Some(prev), Some(run)) if Rc::ptr_eq(prev, texture) => run.end = i + 1,
            _ => runs.push(i..i + 1),
        }
        previous = Some(texture);
    }
    runs
}
