/// Hands out the next value in a sequence.
pub trait Identifier<Value> {
    type Value;
    fn next(&mut self) -> Value;
    /// The most recent value handed out.
    fn latest(&self) -> Value;
}

/// A monotonic counter.  The navigator uses one to stamp errands with a generation, and each
/// accessible column uses one to number its nodes.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    derive_more::Deref,
    derive_more::DerefMut,
)]
pub struct Counter(u64);

impl Counter {
    pub fn starting_at(value: u64) -> Self {
        Self(value)
    }
}

impl Identifier<u64> for Counter {
    type Value = u64;
    fn next(&mut self) -> Self::Value {
        self.0 += 1;
        self.0
    }

    fn latest(&self) -> Self::Value {
        self.0
    }
}

#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    derive_more::Deref,
    derive_more::DerefMut,
)]
pub struct Id<T: Identifier<U>, U> {
    #[deref]
    #[deref_mut]
    id: T,
    _phantom: std::marker::PhantomData<U>,
}

impl Id<Counter, u64> {
    pub fn counter() -> Self {
        Self::starting_at(0)
    }

    /// A counter whose first id is `base + 1`, so that separate columns never share node ids.
    pub fn starting_at(base: u64) -> Self {
        let id = Counter::starting_at(base);
        let _phantom = std::marker::PhantomData;
        Self { id, _phantom }
    }

    pub fn node_id(&mut self) -> accesskit::NodeId {
        let id = self.next();
        accesskit::NodeId(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_only_go_up() {
        let mut generation = Counter::default();
        assert_eq!(generation.latest(), 0);
        assert_eq!(generation.next(), 1);
        assert_eq!(generation.next(), 2);
        assert_eq!(generation.latest(), 2);
    }

    #[test]
    fn node_ids_start_past_the_base() {
        let mut id = Id::starting_at(1 << 32);
        assert_eq!(id.node_id(), accesskit::NodeId((1 << 32) + 1));
    }
}
