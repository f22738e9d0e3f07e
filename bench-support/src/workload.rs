//! Deterministic user and traffic generation.

use std::ops::Range;

use rand::distr::Alphanumeric;
use rand::rngs::SmallRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

/// Length of generated secrets.
pub const SECRET_LEN: usize = 16;

/// Identity for the `i`-th generated user.
pub fn identity(i: usize) -> String {
    format!("user_{i}")
}

/// Produces `user_{i}` identities with random alphanumeric secrets.
#[derive(Debug, Clone)]
pub struct CredentialGenerator {
    rng: SmallRng,
}

impl CredentialGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn secret(&mut self) -> String {
        (&mut self.rng)
            .sample_iter(Alphanumeric)
            .take(SECRET_LEN)
            .map(char::from)
            .collect()
    }

    /// One `(identity, secret)` pair per index in `range`.
    pub fn batch(&mut self, range: Range<usize>) -> Vec<(String, String)> {
        range.map(|i| (identity(i), self.secret())).collect()
    }
}

/// Skewed user selection.
///
/// A fixed subset of `power_users_ratio × users` users is sampled up front.
/// Each pick comes from that subset with probability `power_users_ratio`,
/// otherwise uniformly from all users.
#[derive(Debug, Clone)]
pub struct TrafficModel {
    users: usize,
    power_users: Vec<usize>,
    ratio: f64,
    rng: SmallRng,
}

impl TrafficModel {
    pub fn new(users: usize, power_users_ratio: f64, seed: u64) -> Self {
        let ratio = if power_users_ratio.is_finite() {
            power_users_ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let mut rng = SmallRng::seed_from_u64(seed);
        let count = ((users as f64) * ratio) as usize;
        let power_users = index::sample(&mut rng, users, count.min(users)).into_vec();
        Self {
            users,
            power_users,
            ratio,
            rng,
        }
    }

    /// Same power-user set, independent pick stream.
    pub fn fork(&self, seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            ..self.clone()
        }
    }

    pub fn power_users(&self) -> &[usize] {
        &self.power_users
    }

    /// Index of the next user to authenticate, or `None` with no users.
    pub fn next_user(&mut self) -> Option<usize> {
        if self.users == 0 {
            return None;
        }
        if !self.power_users.is_empty() && self.rng.random_bool(self.ratio) {
            let pick = self.rng.random_range(0..self.power_users.len());
            return Some(self.power_users[pick]);
        }
        Some(self.rng.random_range(0..self.users))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn secrets_are_alphanumeric_and_sized() {
        let mut generator = CredentialGenerator::new(1);
        let secret = generator.secret();
        assert_eq!(secret.len(), SECRET_LEN);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn batch_uses_sequential_identities() {
        let mut generator = CredentialGenerator::new(1);
        let batch = generator.batch(10..13);
        let ids: Vec<_> = batch.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["user_10", "user_11", "user_12"]);
    }

    #[test]
    fn same_seed_same_stream() {
        let mut a = TrafficModel::new(1_000, 0.75, 9);
        let mut b = TrafficModel::new(1_000, 0.75, 9);
        for _ in 0..100 {
            assert_eq!(a.next_user(), b.next_user());
        }
    }

    #[test]
    fn power_user_set_matches_ratio() {
        let model = TrafficModel::new(1_000, 0.25, 3);
        assert_eq!(model.power_users().len(), 250);
        let unique: HashSet<_> = model.power_users().iter().collect();
        assert_eq!(unique.len(), 250);
    }

    #[test]
    fn full_ratio_only_picks_power_users() {
        let mut model = TrafficModel::new(50, 1.0, 5);
        let power: HashSet<_> = model.power_users().iter().copied().collect();
        for _ in 0..200 {
            assert!(power.contains(&model.next_user().unwrap()));
        }
    }

    #[test]
    fn no_users_yields_none() {
        let mut model = TrafficModel::new(0, 0.75, 1);
        assert_eq!(model.next_user(), None);
    }

    #[test]
    fn out_of_range_ratio_is_clamped() {
        let mut model = TrafficModel::new(10, 7.5, 1);
        assert_eq!(model.power_users().len(), 10);
        assert!(model.next_user().unwrap() < 10);
        let mut model = TrafficModel::new(10, f64::NAN, 1);
        assert!(model.power_users().is_empty());
        assert!(model.next_user().unwrap() < 10);
    }
}
