use serde::{Deserialize, Serialize};
use std::{
    fmt,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};
use tracing::debug;

/// Key-distribution strategy for one benchmark run. The snake_case name is
/// shared verbatim between the generator, the flag passed to the executable
/// under test and the chart legend.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CollisionMode {
    NoCollision,
    SomeCollision,
    MaxCollision,
}

impl CollisionMode {
    pub const ALL: [CollisionMode; 3] = [
        Self::NoCollision,
        Self::SomeCollision,
        Self::MaxCollision,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::NoCollision => "no_collision",
            Self::SomeCollision => "some_collision",
            Self::MaxCollision => "max_collision",
        }
    }

    /// command line flag understood by the executable under test
    pub fn flag(self) -> String {
        format!("--{}", self.name())
    }

    /// legend label: underscores to spaces, title cased
    pub fn label(self) -> String {
        self.name()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }

    /// key for the i-th generated row (1-based)
    ///
    /// some_collision keeps ~10% distinct keys; the divisor clamps to 1 for
    /// counts below 10, which degenerates to a single key (0) for every row
    fn key(self, index: u64, count: u64) -> u64 {
        match self {
            Self::NoCollision => index,
            Self::SomeCollision => index % (count / 10).max(1),
            Self::MaxCollision => 1,
        }
    }
}

impl fmt::Display for CollisionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Write a fresh workload file of `count` rows, one `<key> <value>` pair per
/// line, truncating anything previously at `path`. The value is always the
/// 1-based row index; the key depends on the collision mode.
pub fn generate(path: &Path, count: u64, mode: CollisionMode) -> std::io::Result<()> {
    debug!("Generating {count} tuples for {mode} at {}", path.display());

    let mut writer = BufWriter::new(File::create(path)?);
    for index in 1..=count {
        writeln!(writer, "{} {}", mode.key(index, count), index)?;
    }

    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::BTreeSet, fs};
    use tempfile::TempDir;

    fn lines(path: &Path) -> Vec<(u64, u64)> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| {
                let mut fields = line.split_whitespace();
                (
                    fields.next().unwrap().parse().unwrap(),
                    fields.next().unwrap().parse().unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn no_collision_keys_match_indices() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.txt");

        generate(&path, 25, CollisionMode::NoCollision).unwrap();

        let rows = lines(&path);
        assert_eq!(rows.len(), 25);
        for (position, (key, value)) in rows.iter().enumerate() {
            let index = position as u64 + 1;
            assert_eq!(*key, index);
            assert_eq!(*value, index);
        }
    }

    #[test]
    fn max_collision_uses_a_single_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.txt");

        generate(&path, 40, CollisionMode::MaxCollision).unwrap();

        let rows = lines(&path);
        assert_eq!(rows.len(), 40);
        assert!(rows.iter().all(|(key, _)| *key == 1));
        let values: Vec<u64> = rows.iter().map(|(_, value)| *value).collect();
        assert_eq!(values, (1..=40).collect::<Vec<u64>>());
    }

    #[test]
    fn some_collision_keeps_a_tenth_of_the_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.txt");

        generate(&path, 100, CollisionMode::SomeCollision).unwrap();

        let rows = lines(&path);
        assert_eq!(rows.len(), 100);
        let keys: BTreeSet<u64> = rows.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys.len(), 10);
        assert!(keys.iter().all(|key| *key < 10));
    }

    #[test]
    fn some_collision_below_ten_rows_degenerates_to_key_zero() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.txt");

        generate(&path, 5, CollisionMode::SomeCollision).unwrap();

        let rows = lines(&path);
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|(key, _)| *key == 0));
    }

    #[test]
    fn generation_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.txt");

        generate(&path, 64, CollisionMode::SomeCollision).unwrap();
        let first = fs::read(&path).unwrap();
        generate(&path, 64, CollisionMode::SomeCollision).unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn generation_truncates_previous_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.txt");

        generate(&path, 50, CollisionMode::NoCollision).unwrap();
        generate(&path, 3, CollisionMode::NoCollision).unwrap();

        assert_eq!(lines(&path).len(), 3);
    }

    #[test]
    fn names_flags_and_labels_share_the_mode_identifier() {
        assert_eq!(CollisionMode::NoCollision.flag(), "--no_collision");
        assert_eq!(CollisionMode::SomeCollision.flag(), "--some_collision");
        assert_eq!(CollisionMode::MaxCollision.label(), "Max Collision");
        assert_eq!(CollisionMode::SomeCollision.label(), "Some Collision");
    }
}
