use crate::error::TreeResult;

const SIZE_UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];

/// What a provider knows about one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEntry {
    /// Atomic entry with a concrete size.
    Leaf { name: String, size: u64 },
    /// Composite entry; `children` are identities, in display order.
    Internal { name: String, children: Vec<String> },
}

impl SourceEntry {
    pub fn name(&self) -> &str {
        match self {
            SourceEntry::Leaf { name, .. } | SourceEntry::Internal { name, .. } => name,
        }
    }
}

/// Shape of a node as far as suffix formatting is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeShape {
    pub child_count: usize,
    pub data_size: u64,
}

/// Supplier of hierarchy data for a `TmTree`.
///
/// Identities are opaque strings (a path, a key) that can be handed back to
/// `load` later to rebuild an equivalent node.
pub trait NodeSource: Send + Sync {
    fn load(&self, identity: &str) -> TreeResult<SourceEntry>;

    /// Separator placed between names in a node's path string.
    fn separator(&self) -> &str;

    /// Trailing description shown after a node's path.
    fn suffix(&self, shape: NodeShape) -> String {
        describe(shape)
    }
}

/// `" (file, 1.00kB)"` for leaves, `" (folder, 3 items, 2.50MB)"` otherwise.
pub fn describe(shape: NodeShape) -> String {
    let mut components = Vec::with_capacity(3);
    if shape.child_count == 0 {
        components.push("file".to_string());
    } else {
        components.push("folder".to_string());
        components.push(format!("{} items", shape.child_count));
    }
    components.push(format_size(shape.data_size));
    format!(" ({})", components.join(", "))
}

/// Format a byte count with two decimals, stepping by 1024 until the value
/// drops below 1024 or the largest unit is reached.
pub fn format_size(size: u64) -> String {
    let mut value = size as f64;
    let mut unit_index = 0;
    while value >= 1024.0 && unit_index < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit_index += 1;
    }
    format!("{:.2}{}", value, SIZE_UNITS[unit_index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0.00B")]
    #[case(1023, "1023.00B")]
    #[case(1024, "1.00kB")]
    #[case(12_636, "12.34kB")]
    #[case(3 * 1024 * 1024 + 512 * 1024, "3.50MB")]
    #[case(1024u64.pow(4), "1.00TB")]
    #[case(2048 * 1024u64.pow(4), "2048.00TB")]
    fn test_format_size(#[case] size: u64, #[case] expected: &str) {
        assert_eq!(format_size(size), expected);
    }

    struct Fixed;

    impl NodeSource for Fixed {
        fn load(&self, identity: &str) -> TreeResult<SourceEntry> {
            Err(crate::error::TreeError::MissingEntry(identity.to_string()))
        }

        fn separator(&self) -> &str {
            "/"
        }
    }

    #[test]
    fn test_default_suffix() {
        let leaf = NodeShape {
            child_count: 0,
            data_size: 2048,
        };
        let folder = NodeShape {
            child_count: 3,
            data_size: 100,
        };
        assert_eq!(Fixed.suffix(leaf), " (file, 2.00kB)");
        assert_eq!(Fixed.suffix(folder), " (folder, 3 items, 100.00B)");
    }
}
