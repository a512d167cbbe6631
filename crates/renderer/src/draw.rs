//! Draw targets: the rendering context a mesh records its draw into.

use std::ops::Range;

use wgpu::{BindGroup, Buffer, Queue, RenderPass, RenderPipeline};

/// Everything a mesh draw needs from the rendering context.
pub trait DrawTarget {
    /// Upload `data` to the start of `buffer` before the frame executes.
    fn write_buffer(&mut self, buffer: &Buffer, data: &[u8]);
    fn set_pipeline(&mut self, pipeline: &RenderPipeline);
    fn set_bind_group(&mut self, index: u32, bind_group: &BindGroup);
    fn set_vertex_buffer(&mut self, slot: u32, buffer: &Buffer);
    /// Non-indexed, single-instance draw.
    fn draw(&mut self, vertices: Range<u32>);
}

/// A render pass plus the queue used for uniform uploads.
pub struct Frame<'a> {
    queue: &'a Queue,
    pass: RenderPass<'a>,
}

impl<'a> Frame<'a> {
    pub fn new(queue: &'a Queue, pass: RenderPass<'a>) -> Self {
        Self { queue, pass }
    }
}

impl DrawTarget for Frame<'_> {
    fn write_buffer(&mut self, buffer: &Buffer, data: &[u8]) {
        self.queue.write_buffer(buffer, 0, data);
    }

    fn set_pipeline(&mut self, pipeline: &RenderPipeline) {
        self.pass.set_pipeline(pipeline);
    }

    fn set_bind_group(&mut self, index: u32, bind_group: &BindGroup) {
        self.pass.set_bind_group(index, bind_group, &[]);
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &Buffer) {
        self.pass.set_vertex_buffer(slot, buffer.slice(..));
    }

    fn draw(&mut self, vertices: Range<u32>) {
        self.pass.draw(vertices, 0..1);
    }
}
