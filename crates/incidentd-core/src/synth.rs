//! Synthetic ticket generation.
//!
//! Produces plausible incident tickets for demos and tests. The generator
//! never touches global randomness: callers inject the RNG, so a seeded
//! `StdRng` makes every batch reproducible and retention-cycle tests stay
//! deterministic.

use rand::Rng;

use crate::ticket::{Category, ErrorClass, NewTicket, Priority, TicketId, TicketStatus};

const APPLICATIONS: &[&str] = &[
    "InventorySystem",
    "OrderService",
    "WebPortal",
    "AnalyticsApp",
    "HRTool",
];

const PRIORITIES: &[Priority] = &[Priority::Low, Priority::Medium, Priority::High];

/// Fraction of generated tickets created already resolved.
const RESOLVED_RATIO: f64 = 0.3;

const NETWORK_SUMMARIES: &[&str] = &[
    "Network latency is high",
    "Packet loss detected in network",
    "DNS resolution failure",
];
const SERVER_SUMMARIES: &[&str] = &[
    "Server is not responding",
    "Server CPU usage is 100%",
    "Server ran out of memory",
];
const DATABASE_SUMMARIES: &[&str] = &[
    "Database connection timeout",
    "Slow database query execution",
    "Database server not reachable",
];
const API_SUMMARIES: &[&str] = &[
    "API is returning 500 errors",
    "Null pointer exception in API",
    "API response time is very slow",
];
const UI_SUMMARIES: &[&str] = &[
    "Frontend UI is not loading",
    "UI throwing a JavaScript error",
    "Layout issue on dashboard page",
];
const SECURITY_SUMMARIES: &[&str] = &[
    "Repeated failed login attempts",
    "Unexpected privilege escalation detected",
    "TLS certificate validation failure",
];

const fn summaries_for(category: Category) -> &'static [&'static str] {
    match category {
        Category::Network => NETWORK_SUMMARIES,
        Category::Server => SERVER_SUMMARIES,
        Category::Database => DATABASE_SUMMARIES,
        Category::Api => API_SUMMARIES,
        Category::Ui => UI_SUMMARIES,
        Category::Security => SECURITY_SUMMARIES,
    }
}

/// Generator of synthetic [`NewTicket`]s over an injected RNG.
#[derive(Debug)]
pub struct TicketGenerator<R: Rng> {
    rng: R,
}

impl<R: Rng> TicketGenerator<R> {
    /// Creates a generator over the given RNG.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Generates one ticket. The category is always admissible for the
    /// chosen error class, so the result passes [`NewTicket::validate`].
    pub fn next_ticket(&mut self) -> NewTicket {
        let error_class = if self.rng.random_bool(0.5) {
            ErrorClass::Infrastructure
        } else {
            ErrorClass::Application
        };
        let category = *self.pick(Category::allowed_for(error_class));
        let summary = (*self.pick(summaries_for(category))).to_string();
        let status = if self.rng.random_bool(RESOLVED_RATIO) {
            TicketStatus::Resolved {
                resolution_secs: self.rng.random_range(300..14_400),
                rca_notes: "Issue resolved after troubleshooting.".to_string(),
            }
        } else {
            TicketStatus::Open
        };

        NewTicket {
            application: (*self.pick(APPLICATIONS)).to_string(),
            server: format!("Server-{:02}", self.rng.random_range(1..=50)),
            error_class,
            summary,
            priority: *self.pick(PRIORITIES),
            category,
            status,
        }
    }

    /// Generates a batch of `n` tickets.
    pub fn batch(&mut self, n: usize) -> Vec<NewTicket> {
        (0..n).map(|_| self.next_ticket()).collect()
    }

    /// Picks a parent/child pair from a batch of just-created ids.
    ///
    /// Returns `None` when fewer than two ids are available; the endpoints
    /// are always distinct.
    pub fn pick_link(&mut self, ids: &[TicketId]) -> Option<(TicketId, TicketId)> {
        if ids.len() < 2 {
            return None;
        }
        let parent_idx = self.rng.random_range(0..ids.len());
        let mut child_idx = self.rng.random_range(0..ids.len() - 1);
        if child_idx >= parent_idx {
            child_idx += 1;
        }
        Some((ids[parent_idx], ids[child_idx]))
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.rng.random_range(0..items.len())]
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn generated_tickets_pass_validation() {
        let mut generator = TicketGenerator::new(StdRng::seed_from_u64(7));
        for ticket in generator.batch(100) {
            ticket.validate().expect("generated ticket must be valid");
            assert!(ticket.category.is_valid_for(ticket.error_class));
            if let TicketStatus::Resolved {
                resolution_secs, ..
            } = ticket.status
            {
                assert!(resolution_secs >= 300);
            }
        }
    }

    #[test]
    fn same_seed_generates_same_batch() {
        let mut a = TicketGenerator::new(StdRng::seed_from_u64(42));
        let mut b = TicketGenerator::new(StdRng::seed_from_u64(42));
        assert_eq!(a.batch(20), b.batch(20));
    }

    #[test]
    fn link_endpoints_are_distinct() {
        let mut generator = TicketGenerator::new(StdRng::seed_from_u64(3));
        let ids: Vec<TicketId> = (1..=5).map(TicketId::new).collect();
        for _ in 0..200 {
            let (parent, child) = generator.pick_link(&ids).expect("enough candidates");
            assert_ne!(parent, child);
        }
    }

    #[test]
    fn link_requires_two_candidates() {
        let mut generator = TicketGenerator::new(StdRng::seed_from_u64(3));
        assert!(generator.pick_link(&[]).is_none());
        assert!(generator.pick_link(&[TicketId::new(1)]).is_none());
    }
}
