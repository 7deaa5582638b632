/// Append-only output buffer owned by one in-flight request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator<T> {
    buffer: Vec<T>,
}

impl<T: Copy> Accumulator<T> {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn append(&mut self, chunk: &[T]) {
        self.buffer.extend_from_slice(chunk);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.buffer
    }

    pub fn into_inner(self) -> Vec<T> {
        self.buffer
    }
}
