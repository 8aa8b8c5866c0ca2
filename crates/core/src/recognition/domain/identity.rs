use crate::recognition::domain::similarity::cosine_similarity;

/// Fixed-length face descriptor produced by an embedder.
pub type Embedding = Vec<f32>;

/// A named person with one embedding per enrollment photo.
///
/// Always holds at least one embedding; the constructor takes the first.
#[derive(Clone, Debug, PartialEq)]
pub struct Identity {
    name: String,
    group: String,
    embeddings: Vec<Embedding>,
}

impl Identity {
    pub fn new(name: impl Into<String>, group: impl Into<String>, first: Embedding) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            embeddings: vec![first],
        }
    }

    /// Rebuilds an identity from stored parts; `None` if `embeddings` is empty.
    pub fn from_parts(name: String, group: String, embeddings: Vec<Embedding>) -> Option<Self> {
        if embeddings.is_empty() {
            return None;
        }
        Some(Self {
            name,
            group,
            embeddings,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn embeddings(&self) -> &[Embedding] {
        &self.embeddings
    }

    pub fn push_embedding(&mut self, embedding: Embedding) {
        self.embeddings.push(embedding);
    }

    /// True when any stored embedding is strictly more similar than `threshold`.
    pub fn matches(&self, probe: &[f32], threshold: f64) -> bool {
        self.embeddings
            .iter()
            .any(|e| cosine_similarity(e, probe) > threshold)
    }
}

/// In-memory cache of every identity the store knows about, in store order.
///
/// Owned by the identity resolver; everything else sees it read-only.
#[derive(Clone, Debug, Default)]
pub struct KnownIdentities {
    identities: Vec<Identity>,
}

impl KnownIdentities {
    pub fn new(identities: Vec<Identity>) -> Self {
        Self { identities }
    }

    /// First identity, in store order, that matches `probe`.
    pub fn find_match(&self, probe: &[f32], threshold: f64) -> Option<&Identity> {
        self.identities.iter().find(|i| i.matches(probe, threshold))
    }

    pub fn get(&self, name: &str) -> Option<&Identity> {
        self.identities.iter().find(|i| i.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.identities.iter()
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub(crate) fn insert(&mut self, identity: Identity) {
        self.identities.push(identity);
    }

    /// Appends to a known identity; `false` if `name` is unknown.
    pub(crate) fn append(&mut self, name: &str, embedding: Embedding) -> bool {
        match self.identities.iter_mut().find(|i| i.name() == name) {
            Some(identity) => {
                identity.push_embedding(embedding);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit vector at `degrees` in the plane; cosine between two such
    /// vectors is the cosine of the angle between them.
    fn at_angle(degrees: f64) -> Embedding {
        let r = degrees.to_radians();
        vec![r.cos() as f32, r.sin() as f32]
    }

    #[test]
    fn test_from_parts_rejects_empty() {
        assert!(Identity::from_parts("a".into(), "g".into(), vec![]).is_none());
        assert!(Identity::from_parts("a".into(), "g".into(), vec![vec![1.0]]).is_some());
    }

    #[test]
    fn test_matches_any_embedding() {
        // cos(49.46 deg) ~ 0.65, cos(66.42 deg) ~ 0.40
        let probe = at_angle(0.0);
        let mut alice = Identity::new("Alice", "A1", at_angle(66.42));
        assert!(!alice.matches(&probe, 0.6));
        alice.push_embedding(at_angle(49.46));
        assert!(alice.matches(&probe, 0.6));
    }

    #[test]
    fn test_threshold_is_strict() {
        let identity = Identity::new("Alice", "A1", vec![1.0, 0.0]);
        assert!(!identity.matches(&[1.0, 0.0], 1.0));
    }

    #[test]
    fn test_find_match_returns_first_in_store_order() {
        let known = KnownIdentities::new(vec![
            Identity::new("Alice", "A1", at_angle(40.0)),
            Identity::new("Bob", "B1", at_angle(5.0)),
        ]);
        // both exceed 0.6; Alice comes first even though Bob is closer
        let found = known.find_match(&at_angle(0.0), 0.6).unwrap();
        assert_eq!(found.name(), "Alice");
    }

    #[test]
    fn test_find_match_none() {
        let known = KnownIdentities::new(vec![Identity::new("Alice", "A1", at_angle(90.0))]);
        assert!(known.find_match(&at_angle(0.0), 0.6).is_none());
    }

    #[test]
    fn test_append_to_known_and_unknown() {
        let mut known = KnownIdentities::new(vec![Identity::new("Alice", "A1", vec![1.0])]);
        assert!(known.append("Alice", vec![2.0]));
        assert!(!known.append("Bob", vec![2.0]));
        assert_eq!(known.get("Alice").unwrap().embeddings().len(), 2);
        assert_eq!(known.len(), 1);
    }
}
