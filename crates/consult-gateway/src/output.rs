//! Filesystem export layout (§6 "Filesystem layout"). Triggered once a
//! session reaches `confirmed`: writes `anketa.md`, `anketa.json`, and
//! `dialogue.md` under `output/<date>/<company_slug>_v<n>/`, guarded by a
//! `.agent.pid` file so a second voice-agent process sharing the same
//! output root doesn't race the version-directory scan.

use std::path::{Path, PathBuf};

use tracing::warn;

use consult_anketa::Anketa;
use consult_store::Session;

/// Lowercase, Cyrillic-transliterating, filesystem-safe company slug.
/// Falls back to `"anketa"` when nothing usable survives.
pub fn slugify(company_name: &str) -> String {
    let mut out = String::new();
    for ch in company_name.chars() {
        if let Some(translit) = transliterate(ch) {
            out.push_str(translit);
        } else if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            out.push('_');
        }
    }
    let collapsed: String = out
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    if collapsed.is_empty() {
        "anketa".to_string()
    } else {
        collapsed
    }
}

fn transliterate(ch: char) -> Option<&'static str> {
    let lower = ch.to_lowercase().next().unwrap_or(ch);
    Some(match lower {
        'а' => "a", 'б' => "b", 'в' => "v", 'г' => "g", 'д' => "d", 'е' => "e", 'ё' => "e",
        'ж' => "zh", 'з' => "z", 'и' => "i", 'й' => "y", 'к' => "k", 'л' => "l", 'м' => "m",
        'н' => "n", 'о' => "o", 'п' => "p", 'р' => "r", 'с' => "s", 'т' => "t", 'у' => "u",
        'ф' => "f", 'х' => "kh", 'ц' => "ts", 'ч' => "ch", 'ш' => "sh", 'щ' => "shch",
        'ъ' => "", 'ы' => "y", 'ь' => "", 'э' => "e", 'ю' => "yu", 'я' => "ya",
        _ => return None,
    })
}

/// Find the next free `<slug>_v<n>` directory under `date_dir`, starting at 1.
fn next_version_dir(date_dir: &Path, slug: &str) -> std::io::Result<PathBuf> {
    let mut n = 1u32;
    loop {
        let candidate = date_dir.join(format!("{slug}_v{n}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
        n += 1;
    }
}

fn render_dialogue_markdown(session: &Session) -> String {
    let mut out = String::from("# Dialogue transcript\n\n");
    for turn in &session.dialogue_history {
        let speaker = if turn.role == "assistant" || turn.role == "bot" { "Agent" } else { "Client" };
        out.push_str(&format!("**{speaker}** ({}): {}\n\n", turn.timestamp, turn.content));
    }
    out
}

/// Write the three export artifacts for a confirmed session. Never fails the
/// caller's request — I/O errors are logged and the route proceeds, since
/// the database record (the source of truth) is already committed.
pub async fn write_session_output(output_root: &Path, session: &Session, anketa: &Anketa, anketa_md: &str) {
    let date = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let slug = slugify(&anketa.company_name);
    let date_dir = output_root.join(&date);

    if let Err(e) = tokio::fs::create_dir_all(&date_dir).await {
        warn!(error = %e, session_id = %session.session_id, "failed to create output date directory");
        return;
    }

    let session_dir = match next_version_dir(&date_dir, &slug) {
        Ok(dir) => dir,
        Err(e) => {
            warn!(error = %e, session_id = %session.session_id, "failed to pick a version directory");
            return;
        }
    };
    if let Err(e) = tokio::fs::create_dir_all(&session_dir).await {
        warn!(error = %e, session_id = %session.session_id, "failed to create session output directory");
        return;
    }

    let pid_path = session_dir.join(".agent.pid");
    let _ = tokio::fs::write(&pid_path, std::process::id().to_string()).await;

    let anketa_json = serde_json::to_string_pretty(anketa).unwrap_or_default();
    let dialogue_md = render_dialogue_markdown(session);

    for (name, contents) in [("anketa.md", anketa_md), ("anketa.json", &anketa_json), ("dialogue.md", &dialogue_md)] {
        if let Err(e) = tokio::fs::write(session_dir.join(name), contents).await {
            warn!(error = %e, session_id = %session.session_id, file = name, "failed to write export artifact");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_transliterates_cyrillic_and_lowercases() {
        assert_eq!(slugify("ООО Ромашка"), "ooo_romashka");
    }

    #[test]
    fn slugify_falls_back_to_anketa_when_empty() {
        assert_eq!(slugify("   "), "anketa");
        assert_eq!(slugify(""), "anketa");
    }

    #[test]
    fn slugify_collapses_punctuation_into_underscores() {
        assert_eq!(slugify("Acme, Inc."), "acme_inc");
    }
}
