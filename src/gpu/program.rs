//! Owner of one compiled `wgpu::RenderPipeline` plus its shader module —
//! the "compiled GL program" analogue referenced throughout §4.

pub struct Program {
    id: u64,
    pipeline: wgpu::RenderPipeline,
    label: String,
}

impl Program {
    pub fn new(pipeline: wgpu::RenderPipeline, label: &str) -> Self {
        Self {
            id: super::generate_resource_id(),
            pipeline,
            label: label.to_string(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}
