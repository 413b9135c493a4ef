use std::fmt;

/// One upstream API key.
///
/// The secret is only reachable through [`Credential::secret`]; `Debug`
/// never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Creates a credential from raw input, trimming whitespace.
    /// Returns `None` when nothing is left after trimming.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The secret value, for building the upstream request only.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Ordered, read-only list of interchangeable credentials.
///
/// Order defines the failover sequence: the first credential is always
/// tried first and the pool is never reordered.
#[derive(Debug, Clone, Default)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
}

impl CredentialPool {
    /// Builds a pool from configuration entries. Every entry may itself be a
    /// comma-separated list; blank items are dropped and order is preserved.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let credentials = entries
            .into_iter()
            .flat_map(|entry| {
                entry
                    .as_ref()
                    .split(',')
                    .filter_map(Credential::new)
                    .collect::<Vec<_>>()
            })
            .collect();
        Self { credentials }
    }

    /// Parses a single comma-separated list such as `GEMINI_API_KEYS`.
    pub fn from_list(list: &str) -> Self {
        Self::from_entries([list])
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.credentials.iter()
    }
}
