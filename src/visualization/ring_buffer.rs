use crate::core::Sample;
use crate::error::CapacityError;

/// Fixed-capacity FIFO of samples for one channel.
///
/// Once full, every ingested sample evicts the oldest one. The oldest and
/// newest timestamps are cached so a tab can build its shared time window
/// without walking every buffer.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    slots: Vec<Sample>,
    head: usize,
    tail: usize,
    elements: usize,
    oldest_timestamp: Option<f64>,
    newest_timestamp: Option<f64>,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Result<Self, CapacityError> {
        if capacity == 0 {
            return Err(CapacityError::Zero);
        }

        Ok(Self {
            slots: vec![Sample::default(); capacity],
            head: 0,
            tail: 0,
            elements: 0,
            oldest_timestamp: None,
            newest_timestamp: None,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements == 0
    }

    pub fn is_full(&self) -> bool {
        self.elements == self.capacity()
    }

    pub fn oldest_timestamp(&self) -> Option<f64> {
        self.oldest_timestamp
    }

    pub fn newest_timestamp(&self) -> Option<f64> {
        self.newest_timestamp
    }

    /// `(oldest, newest)` timestamps, `None` while empty
    pub fn time_range(&self) -> Option<(f64, f64)> {
        self.oldest_timestamp.zip(self.newest_timestamp)
    }

    /// Appends samples in order, evicting the oldest once full.
    ///
    /// Callers must ingest in timestamp order; nothing is re-sorted here.
    pub fn ingest<I>(&mut self, samples: I)
    where
        I: IntoIterator<Item = Sample>,
    {
        let capacity = self.capacity();
        let mut ingested = false;

        for sample in samples {
            self.slots[self.tail] = sample;
            self.tail = (self.tail + 1) % capacity;

            if self.elements < capacity {
                self.elements += 1;
            } else {
                self.head = (self.head + 1) % capacity;
            }
            ingested = true;
        }

        if ingested {
            self.oldest_timestamp = Some(self.slots[self.head].timestamp);
            self.newest_timestamp = Some(self.slots[self.newest_index()].timestamp);
        }
    }

    /// Changes capacity, keeping the newest `min(len, new_capacity)` samples.
    ///
    /// Retained samples go back through [`RingBuffer::ingest`] so eviction
    /// and timestamp tracking live in one place.
    pub fn update_capacity(&mut self, new_capacity: usize) -> Result<(), CapacityError> {
        if new_capacity == 0 {
            return Err(CapacityError::Zero);
        }
        if new_capacity == self.capacity() {
            return Ok(());
        }

        let keep = self.elements.min(new_capacity);
        let retained: Vec<Sample> = self.iter().skip(self.elements - keep).collect();

        self.reset();
        self.slots = vec![Sample::default(); new_capacity];
        self.ingest(retained);
        Ok(())
    }

    /// Empties the buffer; capacity stays allocated.
    pub fn reset(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.elements = 0;
        self.oldest_timestamp = None;
        self.newest_timestamp = None;
    }

    /// Walks samples oldest to newest.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Sample> + '_ {
        let capacity = self.capacity();
        (0..self.elements).map(move |offset| self.slots[(self.head + offset) % capacity])
    }

    /// Most recently ingested sample
    pub fn newest(&self) -> Option<Sample> {
        if self.is_empty() {
            None
        } else {
            Some(self.slots[self.newest_index()])
        }
    }

    fn newest_index(&self) -> usize {
        (self.tail + self.capacity() - 1) % self.capacity()
    }
}
