//! Node-facing types: what a computation sees and what it publishes

use std::fmt;
use std::rc::Rc;

/// Stable handle to a node in a [`ComputeGraph`](super::ComputeGraph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result published by a node after a completed update
///
/// Values are behind `Rc` so handing them to several dependents does not
/// copy them. A published value is never mutated afterwards.
#[derive(Debug)]
pub enum Outcome<V> {
    Ready(Rc<V>),
    /// A fail-soft node's computation raised; carries the message
    Failed(Rc<str>),
}

impl<V> Clone for Outcome<V> {
    fn clone(&self) -> Self {
        match self {
            Outcome::Ready(v) => Outcome::Ready(Rc::clone(v)),
            Outcome::Failed(msg) => Outcome::Failed(Rc::clone(msg)),
        }
    }
}

impl<V> Outcome<V> {
    pub fn value(&self) -> Option<&V> {
        match self {
            Outcome::Ready(v) => Some(&**v),
            Outcome::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            Outcome::Ready(_) => None,
            Outcome::Failed(msg) => Some(&**msg),
        }
    }
}

/// Error raised by a computation
///
/// Not a `std::error::Error` itself, so any error type converts into it
/// with `?`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeError(String);

impl ComputeError {
    pub fn msg(message: impl fmt::Display) -> Self {
        Self(message.to_string())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComputeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<E: std::error::Error> From<E> for ComputeError {
    fn from(e: E) -> Self {
        Self(e.to_string())
    }
}

/// Named inputs collected from a node's upstream links for one computation
#[derive(Debug)]
pub struct Inputs<V> {
    slots: Vec<(String, Outcome<V>)>,
}

impl<V> Inputs<V> {
    pub(crate) fn new(slots: Vec<(String, Outcome<V>)>) -> Self {
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Raw outcome bound to a slot, including failure markers
    pub fn get(&self, slot: &str) -> Option<&Outcome<V>> {
        self.slots
            .iter()
            .find(|(name, _)| name == slot)
            .map(|(_, outcome)| outcome)
    }

    /// Value bound to a slot; a missing slot or an upstream failure is an error
    pub fn value(&self, slot: &str) -> Result<&V, ComputeError> {
        match self.get(slot) {
            Some(Outcome::Ready(v)) => Ok(&**v),
            Some(Outcome::Failed(msg)) => Err(ComputeError::msg(format_args!(
                "input '{}' failed: {}",
                slot, msg
            ))),
            None => Err(ComputeError::msg(format_args!("missing input '{}'", slot))),
        }
    }

    /// Value bound to a slot, or `None` when the upstream failed
    ///
    /// A missing slot is still an error: that is a wiring bug, not a
    /// runtime failure.
    pub fn value_or_failed(&self, slot: &str) -> Result<Option<&V>, ComputeError> {
        match self.get(slot) {
            Some(outcome) => Ok(outcome.value()),
            None => Err(ComputeError::msg(format_args!("missing input '{}'", slot))),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Outcome<V>)> {
        self.slots.iter().map(|(name, outcome)| (name.as_str(), outcome))
    }
}

/// A computation hosted by a graph node
pub trait Compute<V> {
    fn compute(&mut self, inputs: &Inputs<V>) -> Result<V, ComputeError>;
}

/// Adapter turning a closure into a [`Compute`]
pub struct FnNode<F>(pub F);

impl<V, F> Compute<V> for FnNode<F>
where
    F: FnMut(&Inputs<V>) -> Result<V, ComputeError>,
{
    fn compute(&mut self, inputs: &Inputs<V>) -> Result<V, ComputeError> {
        (self.0)(inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inputs_lookup() {
        let inputs: Inputs<i32> = Inputs::new(vec![
            ("a".to_string(), Outcome::Ready(Rc::new(3))),
            ("b".to_string(), Outcome::Failed(Rc::from("boom"))),
        ]);
        assert_eq!(inputs.value("a"), Ok(&3));
        assert!(inputs.value("b").unwrap_err().message().contains("boom"));
        assert_eq!(inputs.value_or_failed("b"), Ok(None));
        assert!(inputs.value("c").is_err());
        assert!(inputs.value_or_failed("c").is_err());
    }

    #[test]
    fn test_compute_error_from_std_error() {
        let parse = "x".parse::<i32>().unwrap_err();
        let err: ComputeError = parse.into();
        assert!(!err.message().is_empty());
    }
}
