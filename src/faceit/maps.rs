//! FACEIT map identifiers for the Overwatch 2 map pool.
//!
//! The match details payload only lists map ids (`voting.map.pick`), so the
//! map type used during duration allocation comes from this table.

use crate::cli::types::MapType;

/// Translate a FACEIT map id into its map type. Unlisted ids are `Unknown`.
pub fn map_type_for(map_id: &str) -> MapType {
    match map_id {
        "0x08000000000007E2" // Busan
        | "0x0800000000000662" // Lijang Tower
        | "0x08000000000004B7" // Nepal
        | "0x0800000000000EC0" // Samoa
        | "0x080000000000066D" => MapType::Control, // Ilios
        "0x080000000000075E" // Blizzard World
        | "0x080000000000068D" // Eichenwalde
        | "0x08000000000000D4" // King's Row
        | "0x0800000000000938" // Paraiso
        | "0x0800000000000B4C" => MapType::Hybrid, // Midtown
        "0x0800000000000827" // Circuit Royal
        | "0x08000000000002C3" // Dorado
        | "0x0800000000000756" // Junkertown
        | "0x0800000000000C85" // Shambali Monastery
        | "0x0800000000000871" // Rialto
        | "0x0800000000000184" => MapType::Escort, // Watchpoint Gibraltar
        _ => MapType::Unknown,
    }
}

/// Human readable name for a FACEIT map id, `"Unknown"` when unlisted.
pub fn map_name_for(map_id: &str) -> &'static str {
    match map_id {
        "0x08000000000007E2" => "Busan",
        "0x0800000000000662" => "Lijang Tower",
        "0x08000000000004B7" => "Nepal",
        "0x0800000000000EC0" => "Samoa",
        "0x080000000000066D" => "Ilios",
        "0x080000000000075E" => "Blizzard World",
        "0x080000000000068D" => "Eichenwalde",
        "0x08000000000000D4" => "King's Row",
        "0x0800000000000938" => "Paraiso",
        "0x0800000000000B4C" => "Midtown",
        "0x0800000000000827" => "Circuit Royal",
        "0x08000000000002C3" => "Dorado",
        "0x0800000000000756" => "Junkertown",
        "0x0800000000000C85" => "Shambali Monastery",
        "0x0800000000000871" => "Rialto",
        "0x0800000000000184" => "Watchpoint Gibraltar",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_map_types() {
        assert_eq!(map_type_for("0x08000000000007E2"), MapType::Control);
        assert_eq!(map_type_for("0x08000000000000D4"), MapType::Hybrid);
        assert_eq!(map_type_for("0x08000000000002C3"), MapType::Escort);
    }

    #[test]
    fn test_unknown_map_id() {
        assert_eq!(map_type_for("0xDEADBEEF"), MapType::Unknown);
        assert_eq!(map_name_for("0xDEADBEEF"), "Unknown");
    }

    #[test]
    fn test_every_named_map_has_a_type() {
        let ids = [
            "0x08000000000007E2",
            "0x0800000000000662",
            "0x08000000000004B7",
            "0x0800000000000EC0",
            "0x080000000000066D",
            "0x080000000000075E",
            "0x080000000000068D",
            "0x08000000000000D4",
            "0x0800000000000938",
            "0x0800000000000B4C",
            "0x0800000000000827",
            "0x08000000000002C3",
            "0x0800000000000756",
            "0x0800000000000C85",
            "0x0800000000000871",
            "0x0800000000000184",
        ];
        for id in ids {
            assert_ne!(map_name_for(id), "Unknown", "{id} has no name");
            assert_ne!(map_type_for(id), MapType::Unknown, "{id} has no type");
        }
    }
}
