//! Growable typed buffers with power-of-two growth and hard ceilings.

/// Errors raised when a buffer cannot take more elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    /// A fixed-size buffer would have to grow.
    #[error("buffer is not flexible: {required} elements requested, capacity is {capacity}")]
    CapacityExceeded { required: usize, capacity: usize },
    /// The request exceeds what the buffer format can address.
    #[error("{required} elements exceed the format ceiling of {ceiling}")]
    FormatOverflow { required: usize, ceiling: usize },
    /// The buffer's storage has been released.
    #[error("buffer has been released")]
    Released,
}

/// A contiguous, growable array of plain-old-data elements.
///
/// The logical capacity is always a power of two no smaller than the length.
/// A non-flexible buffer never grows past the capacity it was created with;
/// every buffer, flexible or not, refuses to hold more than `ceiling` elements.
#[derive(Debug, Clone)]
pub struct GrowableBuffer<T: bytemuck::Pod> {
    data: Vec<T>,
    capacity: usize,
    ceiling: usize,
    flexible: bool,
    released: bool,
}

impl<T: bytemuck::Pod> GrowableBuffer<T> {
    /// Create a buffer with room for at least `initial_capacity` elements.
    pub fn new(initial_capacity: usize, ceiling: usize, flexible: bool) -> Self {
        let capacity = initial_capacity.max(1).next_power_of_two();
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            ceiling,
            flexible,
            released: false,
        }
    }

    /// Check that `required` elements would fit, growing if needed.
    pub fn ensure_capacity(&mut self, required: usize) -> Result<(), BufferError> {
        self.check_capacity(required)?;
        if required > self.capacity {
            let new_capacity = required.next_power_of_two();
            log::debug!(
                "Growing {} buffer from {} to {} elements",
                std::any::type_name::<T>(),
                self.capacity,
                new_capacity
            );
            self.data.reserve_exact(new_capacity - self.data.len());
            self.capacity = new_capacity;
        }
        Ok(())
    }

    /// Check that `required` elements would fit, without growing.
    ///
    /// Succeeds whenever [`ensure_capacity`](Self::ensure_capacity) would.
    pub fn check_capacity(&self, required: usize) -> Result<(), BufferError> {
        if self.released {
            return Err(BufferError::Released);
        }
        if required > self.ceiling {
            return Err(BufferError::FormatOverflow {
                required,
                ceiling: self.ceiling,
            });
        }
        if required > self.capacity && !self.flexible {
            log::warn!(
                "Fixed {} buffer asked for {} elements, capacity is {}",
                std::any::type_name::<T>(),
                required,
                self.capacity
            );
            return Err(BufferError::CapacityExceeded {
                required,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Append one element.
    pub fn push(&mut self, value: T) -> Result<(), BufferError> {
        self.ensure_capacity(self.data.len() + 1)?;
        self.data.push(value);
        Ok(())
    }

    /// Append a slice of elements.
    pub fn extend_from_slice(&mut self, values: &[T]) -> Result<(), BufferError> {
        self.ensure_capacity(self.data.len() + values.len())?;
        self.data.extend_from_slice(values);
        Ok(())
    }

    /// Append elements produced by an iterator of known length.
    pub fn extend_exact<It>(&mut self, values: It) -> Result<(), BufferError>
    where
        It: IntoIterator<Item = T>,
        It::IntoIter: ExactSizeIterator,
    {
        let values = values.into_iter();
        self.ensure_capacity(self.data.len() + values.len())?;
        self.data.extend(values);
        Ok(())
    }

    /// Get an element.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    /// Get an element mutably.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.data.get_mut(index)
    }

    /// Elements written so far.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Elements written so far, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Elements written so far, as raw bytes in native endianness.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Elements written so far, as mutable raw bytes.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.data)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Logical capacity. Always a power of two, zero once released.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Maximum element count regardless of flexibility.
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Whether the buffer may grow past its initial capacity.
    pub fn is_flexible(&self) -> bool {
        self.flexible
    }

    /// Reset the length to zero, keeping the storage.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Drop the storage. The buffer refuses every later append.
    pub fn release(&mut self) {
        self.data = Vec::new();
        self.capacity = 0;
        self.released = true;
    }

    /// Whether [`release`](Self::release) has been called.
    pub fn is_released(&self) -> bool {
        self.released
    }
}
