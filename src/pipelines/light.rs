use wgpu::util::DeviceExt;

/// Ambient term plus one directional light, bound at group 1.
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    /// Direction the light travels in, normalised.
    pub direction: [f32; 3],
    pub ambient: f32,
    pub colour: [f32; 3],
    // Uniforms need 16 byte spacing
    _padding: u32,
}

impl LightUniform {
    pub fn new(direction: [f32; 3], ambient: f32, colour: [f32; 3]) -> Self {
        let length = direction.iter().map(|c| c * c).sum::<f32>().sqrt();
        let direction = if length > f32::EPSILON {
            direction.map(|c| c / length)
        } else {
            [0.0, -1.0, 0.0]
        };
        Self {
            direction,
            ambient: ambient.clamp(0.0, 1.0),
            colour,
            _padding: 0,
        }
    }
}

impl LightResources {
    pub fn new(device: &wgpu::Device, uniform: LightUniform) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("light_bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("light_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_uniform_matches_the_wgsl_layout() {
        assert_eq!(std::mem::size_of::<LightUniform>(), 32);
    }

    #[test]
    fn direction_is_normalised() {
        let light = LightUniform::new([0.0, -2.0, 0.0], 1.5, [1.0; 3]);
        assert_eq!(light.direction, [0.0, -1.0, 0.0]);
        assert_eq!(light.ambient, 1.0);
    }
}
