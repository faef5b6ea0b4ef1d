//! A fixed-capacity ring buffer of infectious cohorts.
//!
//! Each slot holds the number of people who recover at the end of one particular day. A cohort
//! infected on day `d` with a recovery period of `r` days is placed in the slot for day `d + r`,
//! so the recovery period that applies to a cohort is the one in effect when it was infected,
//! even if the active period changes later in the run. The head slot always belongs to the
//! current day, which makes finding the recovering cohort O(1).
//!
//! The capacity is fixed when the run starts and must be at least the longest recovery period
//! the run will use.

#[derive(Clone, Debug)]
pub struct InfectiousCohorts {
    slots: Vec<u64>,
    /// Slot of the cohort that recovers at the end of the current day.
    head: usize,
    /// Sum of all slots.
    infectious: u64,
}

impl InfectiousCohorts {
    /// Creates a buffer of `capacity` days holding `initial` people who stay infectious for
    /// `recovery_days` days starting today.
    ///
    /// # Panics
    ///
    /// Panics if `recovery_days` is zero or exceeds `capacity`.
    #[must_use]
    pub fn new(capacity: usize, initial: u64, recovery_days: usize) -> Self {
        assert!(
            recovery_days >= 1 && recovery_days <= capacity,
            "recovery period of {recovery_days} days does not fit in a buffer of {capacity} days"
        );
        let mut slots = vec![0; capacity];
        slots[recovery_days - 1] = initial;
        Self {
            slots,
            head: 0,
            infectious: initial,
        }
    }

    /// The number of people currently infectious.
    #[must_use]
    pub fn infectious(&self) -> u64 {
        self.infectious
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infectious == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Ends the current day: removes the cohort that recovers today and adds `entering` people
    /// who stay infectious for the next `recovery_days` days. Returns the number recovered.
    ///
    /// # Panics
    ///
    /// Panics if `recovery_days` is zero or exceeds the capacity.
    pub fn advance(&mut self, entering: u64, recovery_days: usize) -> u64 {
        let capacity = self.slots.len();
        assert!(
            recovery_days >= 1 && recovery_days <= capacity,
            "recovery period of {recovery_days} days does not fit in a buffer of {capacity} days"
        );
        let leaving = std::mem::take(&mut self.slots[self.head]);
        // When `recovery_days == capacity` this is the slot just emptied.
        self.slots[(self.head + recovery_days) % capacity] += entering;
        self.head = (self.head + 1) % capacity;
        self.infectious = self.infectious - leaving + entering;
        leaving
    }

    /// Counts of currently infectious people by the number of days until they recover, starting
    /// with those who recover at the end of today.
    pub fn by_days_until_recovery(&self) -> impl Iterator<Item = u64> + '_ {
        let (wrapped, from_head) = self.slots.split_at(self.head);
        from_head.iter().chain(wrapped.iter()).copied()
    }
}
