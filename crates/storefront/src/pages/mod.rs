//! Page controllers for the guest checkout saga.
//!
//! One controller per page: catalog, product detail, cart, checkout,
//! payment, confirmation, tracking. Controllers own the data contract and
//! sequencing; the rendering shell draws their view state and executes the
//! [`NavigationTarget`] intents they return. Navigation is never performed
//! here - a controller that wants the customer somewhere else says so in its
//! return value.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod confirmation;
pub mod payment;
pub mod product;
pub mod tracking;

use std::time::Duration;

use blisora_core::{OrderId, OrderRef};

/// How long success screens linger before redirecting.
pub const REDIRECT_DELAY: Duration = Duration::from_secs(2);

/// Where a controller wants the shell to navigate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationTarget {
    /// The catalog.
    Shop,
    /// The cart page.
    Cart,
    /// The checkout page.
    Checkout,
    /// The payment page for a created order (internal id).
    Payment { order_id: OrderId },
    /// The confirmation page for an order (human-facing reference).
    Confirmation { order_ref: OrderRef },
    /// The tracking page, pre-filled from a confirmed order.
    Tracking {
        order_ref: OrderRef,
        email: Option<String>,
    },
}

/// A navigation intent that fires after a fixed delay.
///
/// Success screens show a message for [`REDIRECT_DELAY`] and then move on.
/// The delay is an affordance, not a correctness requirement: it is a timer
/// the shell awaits, and dropping the future cancels the redirect, so a
/// customer navigating away during the delay is not fought.
#[derive(Debug)]
pub struct DelayedNavigation {
    target: NavigationTarget,
    delay: Duration,
}

impl DelayedNavigation {
    /// Redirect to `target` after the standard delay.
    #[must_use]
    pub const fn new(target: NavigationTarget) -> Self {
        Self {
            target,
            delay: REDIRECT_DELAY,
        }
    }

    /// The eventual destination, readable before the delay elapses.
    #[must_use]
    pub const fn target(&self) -> &NavigationTarget {
        &self.target
    }

    /// Wait out the delay, then yield the destination.
    pub async fn wait(self) -> NavigationTarget {
        tokio::time::sleep(self.delay).await;
        self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_delayed_navigation_fires_after_delay() {
        let nav = DelayedNavigation::new(NavigationTarget::Confirmation {
            order_ref: OrderRef::new("BLIS-2001"),
        });

        let started = tokio::time::Instant::now();
        let target = nav.wait().await;
        assert_eq!(started.elapsed(), REDIRECT_DELAY);
        assert_eq!(
            target,
            NavigationTarget::Confirmation {
                order_ref: OrderRef::new("BLIS-2001")
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_navigation_cancels_on_drop() {
        let nav = DelayedNavigation::new(NavigationTarget::Shop);
        let wait = nav.wait();

        // Shell navigates elsewhere before the timer fires: dropping the
        // future must be enough, no cancellation token required.
        drop(wait);
        tokio::time::advance(REDIRECT_DELAY * 2).await;
    }
}
