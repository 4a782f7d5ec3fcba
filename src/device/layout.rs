// device/layout.rs

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    Float,
    Float2,
    Float3,
    Float4,
}

impl VertexFormat {
    pub fn component_count(self) -> u32 {
        match self {
            VertexFormat::Float => 1,
            VertexFormat::Float2 => 2,
            VertexFormat::Float3 => 3,
            VertexFormat::Float4 => 4,
        }
    }

    pub fn size(self) -> u64 {
        self.component_count() as u64 * std::mem::size_of::<f32>() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferElement {
    pub name: &'static str,
    pub format: VertexFormat,
    pub offset: u64,
}

/// Attribute layout of one interleaved vertex buffer. Offsets are assigned in
/// declaration order, shader locations follow the element index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferLayout {
    elements: Vec<BufferElement>,
    stride: u64,
}

impl BufferLayout {
    pub fn new(elements: &[(&'static str, VertexFormat)]) -> Self {
        let mut offset = 0;
        let elements = elements
            .iter()
            .map(|&(name, format)| {
                let element = BufferElement {
                    name,
                    format,
                    offset,
                };
                offset += format.size();
                element
            })
            .collect();

        Self {
            elements,
            stride: offset,
        }
    }

    pub fn elements(&self) -> &[BufferElement] {
        &self.elements
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }
}
