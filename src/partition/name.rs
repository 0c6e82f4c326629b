use std::{cmp::Ordering, fmt, hash::{Hash, Hasher}, ops::Deref};

/// Longest partition name in bytes. Longer names are cut on a character
/// boundary at or below this length.
pub const MAX_NAME_LEN: usize = 31;

#[derive(Clone, Default)]
pub struct PartitionName(heapless::String<MAX_NAME_LEN>);

impl PartitionName {
    /// Builds a name, silently truncating to [`MAX_NAME_LEN`] bytes.
    pub fn new(name: &str) -> Self {
        let mut end = name.len().min(MAX_NAME_LEN);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        PartitionName(heapless::String::try_from(&name[..end]).unwrap_or_default())
    }

    /// Returns `true` if `name` is stored without truncation.
    pub fn fits(name: &str) -> bool {
        name.len() <= MAX_NAME_LEN
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Deref for PartitionName {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for PartitionName {
    fn from(name: &str) -> Self {
        PartitionName::new(name)
    }
}

impl PartialEq for PartitionName {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for PartitionName {}

impl PartialEq<str> for PartitionName {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for PartitionName {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl PartialOrd for PartitionName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PartitionName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl Hash for PartitionName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state)
    }
}

impl fmt::Debug for PartitionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for PartitionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for PartitionName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for PartitionName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(PartitionName::new(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_name_truncation() {
        let name = PartitionName::new("Gaming");
        assert_eq!(name, "Gaming");
        assert!(PartitionName::fits("Gaming"));

        let long = "a".repeat(40);
        let name = PartitionName::new(&long);
        assert_eq!(name.len(), MAX_NAME_LEN);
        assert_eq!(name.as_str(), &long[..MAX_NAME_LEN]);
        assert!(!PartitionName::fits(&long));

        // 'é' is two bytes wide and straddles the limit
        let accented = format!("{}é", "b".repeat(30));
        let name = PartitionName::new(&accented);
        assert_eq!(name.as_str(), "b".repeat(30));
    }

    #[test]
    fn test_partition_name_ordering() {
        let mut names = vec![PartitionName::new("User Space"), PartitionName::new("Gaming")];
        names.sort();
        assert_eq!(names[0], "Gaming");
        assert_eq!(names[1].to_string(), "User Space");
    }
}
