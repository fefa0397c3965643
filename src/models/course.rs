// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course lessons and the default catalogue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A course lesson stored in the `course_content` collection, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseContent {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Embed URL; a placeholder until the lesson video is published
    #[serde(default)]
    pub video_url: String,
    pub order: u32,
    /// Length in seconds, if known
    #[serde(default)]
    pub duration: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lesson as returned to a viewer.
///
/// `video_url` is withheld from viewers without access to paid content.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub order: u32,
    pub duration: Option<f64>,
    pub locked: bool,
}

impl CourseContent {
    pub fn to_lesson(&self, unlocked: bool) -> Lesson {
        Lesson {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            video_url: unlocked.then(|| self.video_url.clone()),
            order: self.order,
            duration: self.duration,
            locked: !unlocked,
        }
    }
}

/// Partial update sent by the admin editor. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContentUpdate {
    #[validate(url)]
    pub video_url: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(range(min = 0.0))]
    pub duration: Option<f64>,
}

impl ContentUpdate {
    pub fn apply(self, content: &mut CourseContent, now: DateTime<Utc>) {
        if let Some(video_url) = self.video_url {
            content.video_url = video_url;
        }
        if let Some(description) = self.description {
            content.description = description;
        }
        if let Some(title) = self.title {
            content.title = title;
        }
        if let Some(duration) = self.duration {
            content.duration = Some(duration);
        }
        content.updated_at = now;
    }
}

const CATALOGUE: &[(&str, &str, &str)] = &[
    (
        "1. INTRO (TO BE CHANGED)",
        "Learn how to set up a Next.js project with TypeScript, Tailwind CSS, and shadcn/ui components.",
        "https://www.youtube.com/embed/your-video-id",
    ),
    (
        "2. Setting Up Your Development Environment",
        "Build a professional landing page with animations, responsive design, and modern UI components.",
        "https://www.youtube.com/embed/your-video-id",
    ),
    (
        "3. Enabling Google Login for Your Web App",
        "Learn how to set up Google login for your web app step by step. This video will guide you through obtaining the necessary credentials from the Google Cloud Console and configuring your site to allow users to sign in with their Google accounts, enhancing security and user experience.",
        "https://www.youtube.com/embed/ZXckMQe8xMQ",
    ),
    (
        "4. Installing MongoDB & Saving Google Login Users",
        "In this video, you will learn how to install MongoDB and set it up for your project. Follow along as we save the first pieces of data—users who log in using Google. This foundational step will prepare your database for managing user information efficiently.",
        "https://www.youtube.com/embed/aW1kv-vhkNo",
    ),
    (
        "5. Integrating Stripe Payments: From Test Mode to Live Transactions",
        "Discover how to integrate Stripe as your payment gateway, starting from test mode and progressing to live transactions with a real credit card. This video covers the entire process, including setting up Stripe, testing payments, and going live, so you can confidently handle payments in your web app.",
        "https://www.youtube.com/embed/ALXuYuj4kEA",
    ),
    (
        "6. Building the Dashboard with the Course Videos and Statistics",
        "Learn how to create a dynamic course dashboard that organizes your videos and displays key user statistics. This video walks you through designing and coding the interface, making it easy for users to access content and track their progress.",
        "https://www.youtube.com/embed/yuR5oJxgvpI",
    ),
    (
        "7. Setting Up Admin Controls & Restricting Content for Paid Users",
        "In this video, you will learn how to create an admin account and implement restrictions to ensure that only paid users can access premium content. We’ll cover user roles, permissions, and securing your content behind the paywall for a seamless experience.",
        "https://www.youtube.com/embed/wavULz_TSlk",
    ),
    (
        "8. Analytics & Tracking",
        "Add user analytics, track visitor locations, and create growth metrics.",
        "https://www.youtube.com/embed/your-video-id",
    ),
    (
        "9. API Development",
        "Build robust API endpoints with Express.js and implement proper authentication.",
        "https://www.youtube.com/embed/your-video-id",
    ),
    (
        "10. Deployment & Optimization",
        "Learn how to deploy your application and implement production best practices.",
        "https://www.youtube.com/embed/your-video-id",
    ),
];

/// Lessons seeded into an empty `course_content` collection.
pub fn default_catalogue(now: DateTime<Utc>) -> Vec<CourseContent> {
    CATALOGUE
        .iter()
        .enumerate()
        .map(|(i, (title, description, video_url))| {
            let order = i as u32 + 1;
            CourseContent {
                id: order.to_string(),
                title: title.to_string(),
                description: description.to_string(),
                video_url: video_url.to_string(),
                order,
                duration: None,
                created_at: now,
                updated_at: now,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalogue_is_ordered() {
        let now = Utc::now();
        let lessons = default_catalogue(now);

        assert_eq!(lessons.len(), 10);
        for (i, lesson) in lessons.iter().enumerate() {
            assert_eq!(lesson.order, i as u32 + 1);
            assert_eq!(lesson.id, lesson.order.to_string());
        }
        assert_eq!(lessons[0].title, "1. INTRO (TO BE CHANGED)");
        assert_eq!(
            lessons[3].title,
            "4. Installing MongoDB & Saving Google Login Users"
        );
        assert_eq!(
            lessons[9].video_url,
            "https://www.youtube.com/embed/your-video-id"
        );
    }

    #[test]
    fn test_update_only_touches_provided_fields() {
        let created = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let later = DateTime::from_timestamp(1_700_000_100, 0).unwrap();
        let mut lesson = default_catalogue(created).remove(2);
        let original_title = lesson.title.clone();

        ContentUpdate {
            video_url: Some("https://www.youtube.com/embed/new".to_string()),
            ..Default::default()
        }
        .apply(&mut lesson, later);

        assert_eq!(lesson.video_url, "https://www.youtube.com/embed/new");
        assert_eq!(lesson.title, original_title);
        assert_eq!(lesson.created_at, created);
        assert_eq!(lesson.updated_at, later);
    }

    #[test]
    fn test_update_rejects_bad_url() {
        let update = ContentUpdate {
            video_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_locked_lesson_hides_video() {
        let lesson = default_catalogue(Utc::now()).remove(3);

        let locked = lesson.to_lesson(false);
        assert!(locked.locked);
        assert!(locked.video_url.is_none());

        let open = lesson.to_lesson(true);
        assert_eq!(open.video_url.as_deref(), Some(lesson.video_url.as_str()));
    }
}
