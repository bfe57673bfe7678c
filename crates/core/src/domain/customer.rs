use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerId(pub Uuid);

impl CustomerId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Scores how well a spoken name matches a directory entry. Higher is better;
/// `None` means the entry should not be offered at all.
pub fn name_match_score(query: &str, candidate: &str) -> Option<u8> {
    let query_tokens = name_tokens(query);
    let candidate_tokens = name_tokens(candidate);
    if query_tokens.is_empty() || candidate_tokens.is_empty() {
        return None;
    }

    if query_tokens == candidate_tokens {
        return Some(100);
    }

    let all_present = query_tokens.iter().all(|token| candidate_tokens.contains(token));
    if all_present {
        return Some(80);
    }

    let prefix_match = query_tokens
        .iter()
        .all(|token| candidate_tokens.iter().any(|candidate| candidate.starts_with(token.as_str())));
    if prefix_match {
        return Some(60);
    }

    let same_surname = query_tokens.last() == candidate_tokens.last();
    if same_surname && query_tokens.len() > 1 {
        return Some(40);
    }

    None
}

/// Picks the best-scoring customer, preferring the earliest entry on ties.
pub fn best_match<'a>(query: &str, customers: &'a [Customer]) -> Option<&'a Customer> {
    let mut best: Option<(u8, &Customer)> = None;
    for customer in customers {
        let Some(score) = name_match_score(query, &customer.name) else {
            continue;
        };
        if best.map(|(best_score, _)| score > best_score).unwrap_or(true) {
            best = Some((score, customer));
        }
    }
    best.map(|(_, customer)| customer)
}

pub fn name_tokens(value: &str) -> Vec<String> {
    value
        .split(|character: char| !character.is_alphanumeric() && character != '\'')
        .filter(|token| !token.is_empty())
        .map(|token| token.trim_matches('\'').to_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{best_match, name_match_score, Customer, CustomerId};

    fn customer(name: &str) -> Customer {
        Customer {
            id: CustomerId::generate(),
            name: name.to_string(),
            address: None,
            phone: None,
            email: None,
        }
    }

    #[test]
    fn exact_match_ignores_case_and_punctuation() {
        assert_eq!(name_match_score("john smith", "John Smith"), Some(100));
        assert_eq!(name_match_score("John  Smith.", "john smith"), Some(100));
    }

    #[test]
    fn partial_names_still_match() {
        assert_eq!(name_match_score("Smith", "John Smith"), Some(80));
        assert_eq!(name_match_score("Jon Smi", "Jonathan Smithers"), Some(60));
        assert_eq!(name_match_score("Jane Smith", "John Smith"), Some(40));
        assert_eq!(name_match_score("Walter White", "John Smith"), None);
    }

    #[test]
    fn best_match_prefers_the_strongest_score() {
        let customers = vec![customer("Mary Smith"), customer("John Smith"), customer("John Smithers")];
        let found = best_match("john smith", &customers).map(|customer| customer.name.as_str());
        assert_eq!(found, Some("John Smith"));
        assert!(best_match("", &customers).is_none());
    }
}
