//! Artifact naming. The filename embeds the source host so an operator can
//! tell at a glance which mirror produced a given archive, and the sweeper
//! matches on the `{prefix}_backup_{database}_` stem so it can never touch
//! files belonging to a different system.

use chrono::{DateTime, Local};
use std::path::PathBuf;

use crate::config::BackupTarget;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Strip the URL scheme and flatten path separators so the host is safe to
/// embed in a filename: `https://erp.example.com/odoo` → `erp.example.com_odoo`.
pub fn sanitize_host(base_url: &str) -> String {
    base_url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .replace('/', "_")
}

pub fn file_name(
    prefix: &str,
    database: &str,
    base_url: &str,
    timestamp: DateTime<Local>,
) -> String {
    format!(
        "{}_backup_{}_{}_{}.zip",
        prefix,
        database,
        sanitize_host(base_url),
        timestamp.format(TIMESTAMP_FORMAT)
    )
}

/// Destination for a fresh backup of `target` taken through `base_url`.
/// Computed per source and per attempt wave, since the name embeds both the
/// source host and a fresh timestamp.
pub fn destination_path(
    target: &BackupTarget,
    base_url: &str,
    timestamp: DateTime<Local>,
) -> PathBuf {
    target
        .storage_dir
        .join(file_name(&target.prefix, &target.database, base_url, timestamp))
}

/// Whether `name` is an artifact belonging to `target`. The sweeper deletes
/// only files this accepts.
pub fn belongs_to_target(name: &str, target: &BackupTarget) -> bool {
    let stem = format!("{}_backup_{}_", target.prefix, target.database);
    name.starts_with(&stem) && name.ends_with(".zip")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn target(prefix: &str, database: &str) -> BackupTarget {
        BackupTarget {
            database: database.to_string(),
            storage_dir: PathBuf::from("/var/backups"),
            prefix: prefix.to_string(),
            sources: Vec::new(),
            retention: None,
        }
    }

    #[test]
    fn sanitizes_scheme_and_slashes() {
        assert_eq!(sanitize_host("https://erp.example.com"), "erp.example.com");
        assert_eq!(sanitize_host("http://10.0.0.5:8069"), "10.0.0.5:8069");
        assert_eq!(
            sanitize_host("https://erp.example.com/odoo"),
            "erp.example.com_odoo"
        );
    }

    #[test]
    fn file_name_embeds_all_parts() {
        let ts = Local.with_ymd_and_hms(2024, 6, 15, 9, 30, 5).unwrap();
        let name = file_name("odoo", "prod", "https://erp.example.com", ts);
        assert_eq!(name, "odoo_backup_prod_erp.example.com_2024-06-15_09-30-05.zip");
    }

    #[test]
    fn accepts_own_artifacts_only() {
        let t = target("odoo", "prod");
        assert!(belongs_to_target(
            "odoo_backup_prod_erp.example.com_2024-06-15_09-30-05.zip",
            &t
        ));
        // Different database, different prefix, wrong extension.
        assert!(!belongs_to_target(
            "odoo_backup_staging_erp.example.com_2024-06-15_09-30-05.zip",
            &t
        ));
        assert!(!belongs_to_target(
            "erp_backup_prod_erp.example.com_2024-06-15_09-30-05.zip",
            &t
        ));
        assert!(!belongs_to_target("odoo_backup_prod_host_x.zip.part", &t));
        assert!(!belongs_to_target("notes.txt", &t));
    }

    #[test]
    fn database_prefix_collision_is_not_a_match() {
        // "prod" must not claim the artifacts of "prod2".
        let t = target("odoo", "prod");
        assert!(!belongs_to_target(
            "odoo_backup_prod2_host_2024-06-15_09-30-05.zip",
            &t
        ));
    }
}
