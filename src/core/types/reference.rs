use crossbeam_utils::CachePadded;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;
use std::sync::LazyLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::core::Atom;
use crate::utils::time;

/// Global reference counter initialized with a timestamp-based seed.
static GLOBAL_REF: CachePadded<LazyLock<AtomicU64>> =
  CachePadded::new(LazyLock::new(|| AtomicU64::new(seed(time::unix()))));

/// Node-qualified unique reference.
///
/// References are 96-bit values (3xu32) drawn from a monotonic process-wide
/// counter. Each outbound call uses a fresh reference to correlate its reply.
///
/// # Format
///
/// References display as `#Ref<node.X.Y.Z>` where `X`, `Y`, `Z` are the
/// 32-bit components, most significant first.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Reference {
  node: Atom,
  bits: [u32; 3],
}

impl Reference {
  /// Bit width of the low component.
  const LOW_BITS: u32 = 18;

  /// Bitmask for the low component.
  const LOW_MASK: u64 = (1 << Self::LOW_BITS) - 1;

  /// Creates a fresh reference owned by `node`.
  #[inline]
  pub fn new(node: Atom) -> Self {
    Self::from_bits(node, pack(GLOBAL_REF.fetch_add(1, Ordering::Relaxed)))
  }

  /// Creates a reference from its raw components.
  #[inline]
  pub const fn from_bits(node: Atom, bits: [u32; 3]) -> Self {
    Self { node, bits }
  }

  /// Returns the node owning this reference.
  #[inline]
  pub const fn node(&self) -> Atom {
    self.node
  }

  /// Returns the raw components.
  #[inline]
  pub const fn bits(&self) -> [u32; 3] {
    self.bits
  }
}

impl Debug for Reference {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    Display::fmt(self, f)
  }
}

impl Display for Reference {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    write!(
      f,
      "#Ref<{}.{}.{}.{}>",
      self.node.as_str(),
      self.bits[2],
      self.bits[1],
      self.bits[0],
    )
  }
}

#[inline]
fn pack(value: u64) -> [u32; 3] {
  [
    (value & Reference::LOW_MASK) as u32,
    ((value >> Reference::LOW_BITS) & u32::MAX as u64) as u32,
    (value >> (Reference::LOW_BITS + u32::BITS)) as u32,
  ]
}

#[inline]
const fn seed(timestamp: Duration) -> u64 {
  let mut data: u64 = 0;
  data |= timestamp.as_secs();
  data |= (timestamp.subsec_micros() as u64) << 32;
  data = data.wrapping_mul(268438039);
  data = data.wrapping_add(timestamp.subsec_micros() as u64);
  data
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use crate::core::Atom;
  use crate::core::Reference;

  #[test]
  fn test_references_are_unique() {
    let node: Atom = Atom::new("a@host");
    let refs: HashSet<Reference> = (0..1000).map(|_| Reference::new(node)).collect();

    assert_eq!(refs.len(), 1000);
  }

  #[test]
  fn test_display() {
    let reference: Reference = Reference::from_bits(Atom::new("a@host"), [1, 2, 3]);

    assert_eq!(reference.to_string(), "#Ref<a@host.3.2.1>");
  }
}
