//! User-agent rotation.

use std::sync::{Mutex, PoisonError};

/// A pool of user agents sampled pseudo-randomly per attempt.
///
/// Seeded pools produce the same sequence every run.
#[derive(Debug)]
pub struct UserAgentPool {
    agents: Vec<String>,
    rng: Mutex<fastrand::Rng>,
}

impl UserAgentPool {
    pub fn new(agents: Vec<String>, seed: Option<u64>) -> Self {
        let rng = seed.map(fastrand::Rng::with_seed).unwrap_or_default();
        Self { agents, rng: Mutex::new(rng) }
    }

    /// Any agent from the pool. Empty pools yield an empty string.
    pub fn pick(&self) -> String {
        self.choose(|_| true).unwrap_or_default()
    }

    /// An agent different from `previous`, unless the pool has no alternative.
    pub fn pick_other(&self, previous: &str) -> String {
        self.choose(|ua| ua != previous).unwrap_or_else(|| previous.to_string())
    }

    fn choose(&self, keep: impl Fn(&str) -> bool) -> Option<String> {
        let candidates: Vec<&String> = self.agents.iter().filter(|ua| keep(ua)).collect();
        if candidates.is_empty() {
            return None;
        }
        let idx = self.rng.lock().unwrap_or_else(PoisonError::into_inner).usize(..candidates.len());
        candidates.get(idx).map(|ua| ua.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodex_core::config::DEFAULT_USER_AGENTS;

    fn pool(seed: u64) -> UserAgentPool {
        UserAgentPool::new(DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect(), Some(seed))
    }

    #[test]
    fn test_pick_from_pool() {
        let pool = pool(1);
        for _ in 0..32 {
            let ua = pool.pick();
            assert!(DEFAULT_USER_AGENTS.contains(&ua.as_str()));
        }
    }

    #[test]
    fn test_pick_other_never_repeats() {
        let pool = pool(42);
        for _ in 0..64 {
            let first = pool.pick();
            let second = pool.pick_other(&first);
            assert_ne!(first, second);
        }
    }

    #[test]
    fn test_seeded_pools_agree() {
        let a = pool(9);
        let b = pool(9);
        let seq_a: Vec<String> = (0..10).map(|_| a.pick()).collect();
        let seq_b: Vec<String> = (0..10).map(|_| b.pick()).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn test_single_agent_pool() {
        let pool = UserAgentPool::new(vec!["only/1.0".into()], None);
        assert_eq!(pool.pick(), "only/1.0");
        assert_eq!(pool.pick_other("only/1.0"), "only/1.0");
    }
}
