// vitrine/src/services/inflight.rs

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Buyers with a checkout currently running.
#[derive(Clone, Default)]
pub struct InFlightCheckouts {
  buyers: Arc<Mutex<HashSet<Uuid>>>,
}

impl InFlightCheckouts {
  pub fn new() -> Self {
    Self::default()
  }

  /// `None` when the buyer already has a checkout in flight.
  pub fn try_begin(&self, buyer_id: Uuid) -> Option<CheckoutPermit> {
    if !self.buyers.lock().insert(buyer_id) {
      return None;
    }
    Some(CheckoutPermit {
      buyers: self.buyers.clone(),
      buyer_id,
    })
  }

  pub fn is_in_flight(&self, buyer_id: Uuid) -> bool {
    self.buyers.lock().contains(&buyer_id)
  }
}

/// Releases the buyer's slot when dropped.
pub struct CheckoutPermit {
  buyers: Arc<Mutex<HashSet<Uuid>>>,
  buyer_id: Uuid,
}

impl Drop for CheckoutPermit {
  fn drop(&mut self) {
    self.buyers.lock().remove(&self.buyer_id);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn second_checkout_for_same_buyer_is_refused_until_release() {
    let checkouts = InFlightCheckouts::new();
    let buyer = Uuid::new_v4();

    let permit = checkouts.try_begin(buyer);
    assert!(permit.is_some());
    assert!(checkouts.try_begin(buyer).is_none());
    assert!(checkouts.try_begin(Uuid::new_v4()).is_some());

    drop(permit);
    assert!(!checkouts.is_in_flight(buyer));
    assert!(checkouts.try_begin(buyer).is_some());
  }
}
