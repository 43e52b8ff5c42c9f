//! Table formatting for CLI output

use clil_sdk::{DocumentInfo, Material, MaterialKind, Subject, UserSummary};
use tabled::{settings::Style, Table, Tabled};

/// Trim an ISO-8601 timestamp to `YYYY-MM-DD HH:MM`
fn format_timestamp(timestamp: &str) -> String {
    let trimmed: String = timestamp.chars().take(16).collect();
    trimmed.replacen('T', " ", 1)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

fn render<R: Tabled>(rows: Vec<R>) -> String {
    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.to_string()
}

/// Render materials as a table
pub fn materials_table(materials: &[Material]) -> String {
    #[derive(Tabled)]
    struct MaterialRow {
        #[tabled(rename = "ID")]
        id: u64,
        #[tabled(rename = "Type")]
        kind: String,
        #[tabled(rename = "Topic")]
        topic: String,
        #[tabled(rename = "Subject")]
        subject: String,
        #[tabled(rename = "Level")]
        level: String,
        #[tabled(rename = "Created")]
        created: String,
    }

    let rows = materials
        .iter()
        .map(|material| MaterialRow {
            id: material.id,
            kind: material
                .kind()
                .map(|kind| kind.key().to_string())
                .unwrap_or_else(|| material.material_type.clone()),
            topic: truncate(&material.topic, 40),
            subject: material.subject.clone().unwrap_or_default(),
            level: material.language_level.clone().unwrap_or_default(),
            created: material
                .created_at
                .as_deref()
                .map(format_timestamp)
                .unwrap_or_default(),
        })
        .collect();

    render::<MaterialRow>(rows)
}

/// Render the known material kinds with their stored names
pub fn kinds_table() -> String {
    #[derive(Tabled)]
    struct KindRow {
        #[tabled(rename = "Kind")]
        key: &'static str,
        #[tabled(rename = "Stored as")]
        display: &'static str,
    }

    let rows = MaterialKind::ALL
        .iter()
        .map(|kind| KindRow {
            key: kind.key(),
            display: kind.display_name(),
        })
        .collect();

    render::<KindRow>(rows)
}

/// Render subjects as a table
pub fn subjects_table(subjects: &[Subject]) -> String {
    #[derive(Tabled)]
    struct SubjectRow {
        #[tabled(rename = "ID")]
        id: u64,
        #[tabled(rename = "Name")]
        name: String,
    }

    let rows = subjects
        .iter()
        .map(|subject| SubjectRow {
            id: subject.id,
            name: subject.name.clone(),
        })
        .collect();

    render::<SubjectRow>(rows)
}

/// Render ingested documents as a table
pub fn documents_table(documents: &[DocumentInfo]) -> String {
    #[derive(Tabled)]
    struct DocumentRow {
        #[tabled(rename = "Document ID")]
        doc_id: String,
        #[tabled(rename = "File")]
        filename: String,
        #[tabled(rename = "Chunks")]
        chunks: u64,
        #[tabled(rename = "Uploaded")]
        uploaded: String,
    }

    let rows = documents
        .iter()
        .map(|document| DocumentRow {
            doc_id: document.doc_id.clone(),
            filename: document.filename.clone(),
            chunks: document.chunk_count,
            uploaded: format_timestamp(&document.uploaded_at),
        })
        .collect();

    render::<DocumentRow>(rows)
}

/// Render user accounts as a table
pub fn users_table(users: &[UserSummary]) -> String {
    #[derive(Tabled)]
    struct UserRow {
        #[tabled(rename = "ID")]
        id: u64,
        #[tabled(rename = "Username")]
        username: String,
        #[tabled(rename = "Email")]
        email: String,
        #[tabled(rename = "Roles")]
        roles: String,
        #[tabled(rename = "Materials")]
        materials: u64,
        #[tabled(rename = "Created")]
        created: String,
    }

    let rows = users
        .iter()
        .map(|user| UserRow {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            roles: user.roles.iter().cloned().collect::<Vec<_>>().join(", "),
            materials: user.material_count,
            created: user
                .created_at
                .as_deref()
                .map(format_timestamp)
                .unwrap_or_default(),
        })
        .collect();

    render::<UserRow>(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material(id: u64, material_type: &str, topic: &str) -> Material {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "materialType": material_type,
            "topic": topic,
            "subject": "Biology",
            "languageLevel": "B1",
            "createdAt": "2024-03-01T09:30:12.345"
        }))
        .unwrap()
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp("2024-03-01T09:30:12.345"), "2024-03-01 09:30");
        assert_eq!(format_timestamp("2024-03-01"), "2024-03-01");
    }

    #[test]
    fn test_truncate_long_topics() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Photosynthese in Pflanzen", 10), "Photosynt…");
    }

    #[test]
    fn test_materials_table_uses_kind_keys() {
        let table = materials_table(&[
            material(1, "Arbeitsblatt", "Photosynthesis"),
            material(2, "Lesetext", "The Water Cycle"),
        ]);

        assert!(table.contains("worksheet"));
        assert!(table.contains("Lesetext"));
        assert!(table.contains("2024-03-01 09:30"));
    }

    #[test]
    fn test_kinds_table_lists_all_kinds() {
        let table = kinds_table();
        for kind in MaterialKind::ALL {
            assert!(table.contains(kind.key()));
        }
        assert!(table.contains("Video-Skript"));
    }

    #[test]
    fn test_users_table_joins_roles() {
        let user: UserSummary = serde_json::from_value(serde_json::json!({
            "id": 3,
            "username": "anna",
            "email": "anna@example.org",
            "roles": ["USER", "ADMIN"],
            "materialCount": 12
        }))
        .unwrap();

        let table = users_table(&[user]);
        assert!(table.contains("ADMIN, USER"));
        assert!(table.contains("12"));
    }
}
