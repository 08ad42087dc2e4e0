//! Address exclusion list
//!
//! Treasury wallets, marketplace/DEX contracts and vending machine wallets
//! whose holdings must not earn rewards. Matching is exact string equality
//! against the raw address, the derived payment address and the derived
//! reward address; no prefix or pattern matching.

use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct ExclusionList {
    addresses: HashSet<String>,
}

impl ExclusionList {
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            addresses: addresses.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(address)
    }

    /// Returns the first candidate found on the list
    pub fn first_match<'a>(&self, candidates: &[&'a str]) -> Option<&'a str> {
        candidates.iter().copied().find(|c| self.contains(c))
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_only() {
        let list = ExclusionList::new(["stake1abc", "addr1xyz"]);

        assert!(list.contains("stake1abc"));
        assert!(!list.contains("stake1ab"));
        assert!(!list.contains("stake1abcd"));
        assert!(!list.contains("STAKE1ABC"));
    }

    #[test]
    fn test_first_match() {
        let list = ExclusionList::new(vec!["addr1xyz".to_string()]);

        assert_eq!(list.first_match(&["addr1aaa", "addr1xyz"]), Some("addr1xyz"));
        assert_eq!(list.first_match(&["addr1aaa", "stake1bbb"]), None);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_empty_list() {
        let list = ExclusionList::default();
        assert!(list.is_empty());
        assert!(!list.contains(""));
    }
}
