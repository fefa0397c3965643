// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store for tests and local development.
//!
//! Mirrors the Firestore operations one-for-one. Data lives only as long as
//! the process.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use crate::models::{
    ContentUpdate, CourseContent, Location, Plan, Session, UpgradeOutcome, User, UserProgress,
};

#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<String, User>>,
    sessions: Arc<DashMap<String, Session>>,
    course_content: Arc<DashMap<String, CourseContent>>,
    progress: Arc<DashMap<String, UserProgress>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_user(&self, user_id: &str) -> Option<User> {
        self.users.get(user_id).map(|u| u.clone())
    }

    pub fn upsert_user(&self, user: &User) {
        self.users.insert(user.id.clone(), user.clone());
    }

    pub fn update_profile(&self, user: &User) {
        if let Some(mut existing) = self.users.get_mut(&user.id) {
            existing.display_name = user.display_name.clone();
            existing.email = user.email.clone();
            existing.profile_picture = user.profile_picture.clone();
        }
    }

    pub fn set_user_location(&self, user_id: &str, location: &Location) -> bool {
        match self.users.get_mut(user_id) {
            Some(mut user) => {
                user.location = Some(location.clone());
                true
            }
            None => false,
        }
    }

    /// The entry guard serializes concurrent upgrades of the same user.
    pub fn upgrade_to_premium(&self, user_id: &str, now: DateTime<Utc>) -> UpgradeOutcome {
        let Some(mut user) = self.users.get_mut(user_id) else {
            return UpgradeOutcome::UserNotFound;
        };
        if user.plan == Plan::Premium {
            return UpgradeOutcome::AlreadyPremium;
        }
        user.plan = Plan::Premium;
        user.purchase_date = Some(now);
        UpgradeOutcome::Upgraded
    }

    pub fn list_premium_users(&self) -> Vec<User> {
        self.users
            .iter()
            .filter(|u| u.plan == Plan::Premium)
            .map(|u| u.clone())
            .collect()
    }

    pub fn count_users(&self) -> u64 {
        self.users.len() as u64
    }

    pub fn create_session(&self, session: &Session) {
        self.sessions.insert(session.id.clone(), session.clone());
    }

    pub fn get_session(&self, session_id: &str) -> Option<Session> {
        self.sessions.get(session_id).map(|s| s.clone())
    }

    pub fn delete_session(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    pub fn list_course_content(&self) -> Vec<CourseContent> {
        let mut lessons: Vec<CourseContent> =
            self.course_content.iter().map(|c| c.clone()).collect();
        lessons.sort_by_key(|c| c.order);
        lessons
    }

    pub fn insert_course_content(&self, lessons: &[CourseContent]) {
        for lesson in lessons {
            self.course_content.insert(lesson.id.clone(), lesson.clone());
        }
    }

    pub fn update_course_content(
        &self,
        id: &str,
        update: ContentUpdate,
        now: DateTime<Utc>,
    ) -> Option<CourseContent> {
        let mut content = self.course_content.get_mut(id)?;
        update.apply(&mut content, now);
        Some(content.clone())
    }

    pub fn upsert_progress(&self, progress: &UserProgress) {
        self.progress.insert(progress.doc_id(), progress.clone());
    }

    pub fn list_progress(&self, user_id: &str) -> Vec<UserProgress> {
        self.progress
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.clone())
            .collect()
    }
}
