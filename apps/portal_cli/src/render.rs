use chrono::{DateTime, Utc};
use client_core::{display_name, ProfileView};
use shared::domain::{Comment, Profile};

/// Coarse "3 hours ago" style age of a timestamp.
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    if seconds < 0 {
        return "in the future".into();
    }
    let (value, unit) = match seconds {
        0..=44 => return "a few seconds ago".into(),
        45..=89 => return "a minute ago".into(),
        s if s < 60 * 45 => ((s + 30) / 60, "minutes"),
        s if s < 60 * 90 => return "an hour ago".into(),
        s if s < 3600 * 22 => ((s + 1800) / 3600, "hours"),
        s if s < 3600 * 36 => return "a day ago".into(),
        s if s < 86400 * 26 => ((s + 43200) / 86400, "days"),
        s if s < 86400 * 45 => return "a month ago".into(),
        s if s < 86400 * 320 => ((s + 86400 * 15) / (86400 * 30), "months"),
        s if s < 86400 * 548 => return "a year ago".into(),
        s => ((s + 86400 * 182) / (86400 * 365), "years"),
    };
    format!("{value} {unit} ago")
}

pub fn comment_block(comment: &Comment, now: DateTime<Utc>) -> String {
    let author = comment.owner.as_deref().map(display_name).unwrap_or("unknown");
    format!(
        "{author} · {} · {} (v{})\n{}\n",
        relative_time(comment.updated_at, now),
        comment.id,
        comment.version,
        comment.content
    )
}

pub fn profile_block(view: &ProfileView) -> String {
    format!(
        "{}\nOrganization: {}\nEmail: {}\nTotal Points: {}",
        view.display_name,
        view.organization,
        view.email.as_deref().unwrap_or("Not set"),
        view.total_points
    )
}

pub fn leaderboard_line(rank: usize, profile: &Profile) -> String {
    format!(
        "{rank:>3}. {:<24} {:>6}",
        profile.name.as_deref().unwrap_or(profile.id.as_str()),
        profile.point.unwrap_or(0)
    )
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use shared::domain::{ClassId, CommentId, ProfileId, Version};

    use super::*;

    fn now() -> DateTime<Utc> {
        "2024-06-01T12:00:00Z".parse().expect("timestamp")
    }

    #[test]
    fn relative_time_buckets() {
        let now = now();
        assert_eq!(relative_time(now, now), "a few seconds ago");
        assert_eq!(relative_time(now - Duration::minutes(10), now), "10 minutes ago");
        assert_eq!(relative_time(now - Duration::hours(3), now), "3 hours ago");
        assert_eq!(relative_time(now - Duration::days(5), now), "5 days ago");
        assert_eq!(relative_time(now - Duration::days(800), now), "2 years ago");
        assert_eq!(relative_time(now + Duration::hours(1), now), "in the future");
    }

    #[test]
    fn comment_block_shows_author_local_part_and_version() {
        let comment = Comment {
            id: CommentId::new("c1"),
            class_id: ClassId::new("class"),
            content: "line one\nline two".into(),
            owner: Some("alice@example.com".into()),
            created_at: now(),
            updated_at: now(),
            version: Version(3),
            deleted: None,
        };
        let block = comment_block(&comment, now());
        assert!(block.starts_with("alice · a few seconds ago · c1 (v3)\n"));
        assert!(block.contains("line one\nline two"));
    }

    #[test]
    fn leaderboard_line_falls_back_to_id() {
        let profile = Profile {
            id: ProfileId::new("bob"),
            user_id: None,
            name: None,
            organization: None,
            point: Some(7),
        };
        let line = leaderboard_line(1, &profile);
        assert!(line.trim_start().starts_with("1. bob"));
        assert!(line.trim_end().ends_with('7'));
    }
}
