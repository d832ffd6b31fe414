//! Per-record presentation: labels, relative dates, attachment links and the
//! ownership check behind the delete affordance.
use crate::api::{Discussion, Endpoints};
use crate::util::one_line;
use chrono::{DateTime, Utc};
use url::Url;

/// Everything the UI needs to draw one discussion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscussionCard {
    pub id: i64,
    pub author: String,
    pub username: String,
    pub when: String,
    pub content: String,
    /// Link to the attached image, if the attachment is an image.
    pub image_url: Option<Url>,
    /// File name of a non-image attachment.
    pub attachment_name: Option<String>,
    pub deletable: bool,
}

impl DiscussionCard {
    pub fn new(
        discussion: &Discussion,
        viewer: Option<i64>,
        endpoints: &Endpoints,
        now: DateTime<Utc>,
    ) -> Self {
        let image_url = attachment_image_url(discussion, endpoints);
        let attachment_name = match (&discussion.attachment, &image_url) {
            (Some(a), None) => Some(one_line(&a.name)),
            _ => None,
        };
        Self {
            id: discussion.id,
            author: one_line(&author_label(discussion)),
            username: discussion.user.username.clone(),
            when: relative_time(discussion.date, now),
            content: discussion.content.clone(),
            image_url,
            attachment_name,
            deletable: can_delete(discussion, viewer),
        }
    }
}

/// `displayName@username`
pub fn author_label(discussion: &Discussion) -> String {
    discussion.user.label()
}

/// Compact age of an epoch-millisecond timestamp relative to `now`.
///
/// `now` under a minute (and for clock skew into the future), then `Nm`,
/// `Nh`, `Nd` up to a week, then the calendar date (`Jun 23`).
pub fn relative_time(date_ms: i64, now: DateTime<Utc>) -> String {
    let Some(date) = DateTime::<Utc>::from_timestamp_millis(date_ms) else {
        return String::new();
    };
    let elapsed = now.signed_duration_since(date);

    if elapsed.num_seconds() < 60 {
        "now".to_string()
    } else if elapsed.num_minutes() < 60 {
        format!("{}m", elapsed.num_minutes())
    } else if elapsed.num_hours() < 24 {
        format!("{}h", elapsed.num_hours())
    } else if elapsed.num_days() < 7 {
        format!("{}d", elapsed.num_days())
    } else {
        date.format("%b %d").to_string()
    }
}

/// Public URL of the attachment, only when it is an image.
pub fn attachment_image_url(discussion: &Discussion, endpoints: &Endpoints) -> Option<Url> {
    discussion
        .attachment
        .as_ref()
        .filter(|a| a.is_image())
        .map(|a| endpoints.attachment_image(&a.name))
}

/// Only the author may delete, and anonymous viewers never can.
pub fn can_delete(discussion: &Discussion, viewer: Option<i64>) -> bool {
    viewer.is_some_and(|id| id == discussion.user.id)
}

pub fn delete_prompt(discussion: &Discussion) -> String {
    format!("Are you sure to delete \"{}\"?", one_line(&discussion.content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FileAttachment, UserSummary};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn discussion(attachment: Option<FileAttachment>) -> Discussion {
        Discussion {
            id: 10,
            content: "This is the first discussion".into(),
            date: 1561294668539,
            user: UserSummary {
                id: 1,
                username: "user1".into(),
                display_name: "display1".into(),
                image: Some("profile1.png".into()),
            },
            attachment,
        }
    }

    fn attachment(file_type: &str) -> FileAttachment {
        FileAttachment {
            id: 4,
            date: None,
            name: "f00d.png".into(),
            file_type: file_type.into(),
        }
    }

    fn endpoints() -> Endpoints {
        Endpoints::new("http://localhost:8080", "/api/1.0").unwrap()
    }

    fn posted_at() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(1561294668539).unwrap()
    }

    #[test]
    fn test_author_label() {
        assert_eq!(author_label(&discussion(None)), "display1@user1");
    }

    #[test]
    fn test_relative_time_buckets() {
        let date = 1561294668539;
        let at = |secs: i64| posted_at() + chrono::Duration::seconds(secs);
        assert_eq!(relative_time(date, at(5)), "now");
        assert_eq!(relative_time(date, at(-30)), "now");
        assert_eq!(relative_time(date, at(5 * 60)), "5m");
        assert_eq!(relative_time(date, at(3 * 3600)), "3h");
        assert_eq!(relative_time(date, at(2 * 86400)), "2d");
        assert_eq!(relative_time(date, at(30 * 86400)), "Jun 23");
    }

    #[test]
    fn test_relative_time_calendar_date() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(relative_time(1561294668539, now), "Jun 23");
    }

    #[test]
    fn test_image_attachment_url() {
        let url = attachment_image_url(&discussion(Some(attachment("image/png"))), &endpoints());
        assert_eq!(
            url.map(|u| u.to_string()).as_deref(),
            Some("http://localhost:8080/images/attachments/f00d.png")
        );
    }

    #[test]
    fn test_non_image_attachment_has_no_url() {
        let d = discussion(Some(attachment("application/pdf")));
        assert!(attachment_image_url(&d, &endpoints()).is_none());

        let card = DiscussionCard::new(&d, None, &endpoints(), posted_at());
        assert_eq!(card.attachment_name.as_deref(), Some("f00d.png"));
    }

    #[test]
    fn test_delete_only_for_author() {
        let d = discussion(None);
        assert!(can_delete(&d, Some(1)));
        assert!(!can_delete(&d, Some(2)));
        assert!(!can_delete(&d, None));
    }

    #[test]
    fn test_delete_prompt() {
        assert_eq!(
            delete_prompt(&discussion(None)),
            "Are you sure to delete \"This is the first discussion\"?"
        );
    }

    #[test]
    fn test_card_collects_presentation() {
        let card = DiscussionCard::new(
            &discussion(Some(attachment("image/png"))),
            Some(1),
            &endpoints(),
            posted_at(),
        );
        assert_eq!(card.author, "display1@user1");
        assert_eq!(card.when, "now");
        assert!(card.deletable);
        assert!(card.image_url.is_some());
        assert!(card.attachment_name.is_none());
    }
}
