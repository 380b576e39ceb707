//! Workspace collection naming.

/// Prefix of every workspace collection.
pub const COLLECTION_PREFIX: &str = "ws-";

/// Longest collection name accepted by the storage engines.
pub const MAX_COLLECTION_LEN: usize = 63;

/// Hex digits of the workspace id digest appended to lossy names.
const DIGEST_LEN: usize = 16;

/// Separates the readable part from the digest. Never produced by
/// normalization, so digest names cannot collide with plain ones.
const DIGEST_SEPARATOR: char = '_';

/// Collection name for a workspace id.
///
/// Ids made only of `[A-Za-z0-9-]` that fit in 63 characters map to
/// `ws-<id>` unchanged. Any other id keeps a readable prefix (other characters
/// become `-`) followed by `_` and a blake3 digest of the raw id, so distinct
/// ids always get distinct collections.
#[must_use]
pub fn collection_name(workspace_id: &str) -> String {
    let mut name = String::with_capacity(MAX_COLLECTION_LEN);
    name.push_str(COLLECTION_PREFIX);

    let mut lossy = false;
    name.extend(workspace_id.chars().map(|c| {
        if c.is_ascii_alphanumeric() || c == '-' {
            c
        } else {
            lossy = true;
            '-'
        }
    }));

    if !lossy && name.len() <= MAX_COLLECTION_LEN {
        return name;
    }

    // only ASCII remains, so byte truncation is char safe
    name.truncate(MAX_COLLECTION_LEN - DIGEST_LEN - 1);
    let digest = blake3::hash(workspace_id.as_bytes()).to_hex();
    name.push(DIGEST_SEPARATOR);
    name.push_str(&digest[..DIGEST_LEN]);
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_passes_through() {
        let id = "3f2b8c1e-9a4d-4e6f-8b2a-1c3d5e7f9a0b";
        assert_eq!(collection_name(id), format!("ws-{id}"));
    }

    #[test]
    fn test_special_characters_replaced_and_tagged() {
        let name = collection_name("team a/b_c.d");
        assert!(name.starts_with("ws-team-a-b-c-d_"));
        assert_eq!(name.len(), "ws-team-a-b-c-d_".len() + DIGEST_LEN);
        assert!(
            name.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_non_ascii_is_tagged() {
        let name = collection_name("ünï");
        assert!(name.starts_with("ws----_"));
    }

    #[test]
    fn test_length_capped() {
        let name = collection_name(&"x".repeat(200));
        assert_eq!(name.len(), MAX_COLLECTION_LEN);
        assert!(name.starts_with(COLLECTION_PREFIX));
    }

    #[test]
    fn test_longest_plain_id_passes_through() {
        let id = "y".repeat(MAX_COLLECTION_LEN - COLLECTION_PREFIX.len());
        assert_eq!(collection_name(&id), format!("ws-{id}"));
    }

    #[test]
    fn test_distinct_ids_distinct_names() {
        assert_ne!(collection_name("alpha"), collection_name("beta"));
    }

    #[test]
    fn test_ids_equal_after_normalization_stay_distinct() {
        let names = [
            collection_name("team a"),
            collection_name("team_a"),
            collection_name("team.a"),
            collection_name("team-a"),
        ];
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_long_ids_differing_after_cap_stay_distinct() {
        let base = "w".repeat(70);
        let a = collection_name(&format!("{base}1"));
        let b = collection_name(&format!("{base}2"));

        assert_ne!(a, b);
        assert_eq!(a.len(), MAX_COLLECTION_LEN);
        assert_eq!(b.len(), MAX_COLLECTION_LEN);
    }

    #[test]
    fn test_stable_across_calls() {
        assert_eq!(collection_name("team a"), collection_name("team a"));
    }
}
