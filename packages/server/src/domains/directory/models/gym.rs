use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{GymId, MediaId};

/// A gym listed in the directory (soft-deleted gyms are never loaded)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Gym {
    pub id: GymId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub trending: bool,
}

impl Gym {
    pub async fn find_by_ids(ids: &[GymId], pool: &PgPool) -> Result<Vec<Self>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let gyms = sqlx::query_as::<_, Self>(
            r#"
            SELECT id, name, slug, description, city, state, trending
            FROM gyms
            WHERE id = ANY($1) AND deleted_at IS NULL
            "#,
        )
        .bind(ids)
        .fetch_all(pool)
        .await?;
        Ok(gyms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "media_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Logo,
    Gallery,
    Featured,
}

/// File attached to a gym
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GymMedia {
    pub id: MediaId,
    pub gym_id: GymId,
    pub kind: MediaKind,
    pub path: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GymMedia {
    /// All media for the given gyms, newest first.
    pub async fn find_for_gyms(ids: &[GymId], pool: &PgPool) -> Result<Vec<Self>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let media = sqlx::query_as::<_, Self>(
            r#"
            SELECT id, gym_id, kind, path, title, created_at
            FROM gym_media
            WHERE gym_id = ANY($1)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(ids)
        .fetch_all(pool)
        .await?;
        Ok(media)
    }
}

/// A gym with its attachments resolved.
#[derive(Debug, Clone)]
pub struct GymRecord {
    pub gym: Gym,
    pub logo: Option<GymMedia>,
    pub gallery: Vec<GymMedia>,
    pub featured_image: Option<GymMedia>,
}

impl GymRecord {
    pub fn new(gym: Gym) -> Self {
        Self {
            gym,
            logo: None,
            gallery: Vec::new(),
            featured_image: None,
        }
    }

    /// Attach media rows to their gyms. Gallery order follows the input order;
    /// for a single-slot attachment the first row wins.
    pub fn assemble(gyms: Vec<Gym>, media: Vec<GymMedia>) -> Vec<Self> {
        let mut records: Vec<Self> = gyms.into_iter().map(Self::new).collect();

        for item in media {
            let Some(record) = records.iter_mut().find(|r| r.gym.id == item.gym_id) else {
                continue;
            };
            match item.kind {
                MediaKind::Logo => {
                    record.logo.get_or_insert(item);
                }
                MediaKind::Featured => {
                    record.featured_image.get_or_insert(item);
                }
                MediaKind::Gallery => record.gallery.push(item),
            }
        }

        records
    }

    /// The designated featured image, else the most recently created gallery image.
    pub fn display_image(&self) -> Option<&GymMedia> {
        self.featured_image
            .as_ref()
            .or_else(|| self.gallery.iter().max_by_key(|m| (m.created_at, m.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn gym(id: i64) -> Gym {
        Gym {
            id: GymId::new(id),
            name: format!("Gym {}", id),
            slug: format!("gym-{}", id),
            description: None,
            city: None,
            state: None,
            trending: false,
        }
    }

    fn media(id: i64, gym_id: i64, kind: MediaKind, day: u32) -> GymMedia {
        GymMedia {
            id: MediaId::new(id),
            gym_id: GymId::new(gym_id),
            kind,
            path: format!("/media/{}.jpg", id),
            title: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_assemble_routes_media_by_kind() {
        let records = GymRecord::assemble(
            vec![gym(1), gym(2)],
            vec![
                media(10, 1, MediaKind::Logo, 1),
                media(11, 1, MediaKind::Gallery, 2),
                media(12, 2, MediaKind::Featured, 3),
                media(13, 99, MediaKind::Gallery, 4),
            ],
        );

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].logo.as_ref().map(|m| m.id), Some(MediaId::new(10)));
        assert_eq!(records[0].gallery.len(), 1);
        assert_eq!(records[1].featured_image.as_ref().map(|m| m.id), Some(MediaId::new(12)));
    }

    #[test]
    fn test_display_image_prefers_featured() {
        let mut record = GymRecord::new(gym(1));
        record.gallery = vec![media(1, 1, MediaKind::Gallery, 5)];
        record.featured_image = Some(media(2, 1, MediaKind::Featured, 1));

        assert_eq!(record.display_image().map(|m| m.id), Some(MediaId::new(2)));
    }

    #[test]
    fn test_display_image_falls_back_to_newest_gallery_image() {
        let mut record = GymRecord::new(gym(1));
        record.gallery = vec![
            media(1, 1, MediaKind::Gallery, 3),
            media(2, 1, MediaKind::Gallery, 9),
            media(3, 1, MediaKind::Gallery, 6),
        ];

        assert_eq!(record.display_image().map(|m| m.id), Some(MediaId::new(2)));
    }

    #[test]
    fn test_display_image_none_without_media() {
        assert!(GymRecord::new(gym(1)).display_image().is_none());
    }
}
