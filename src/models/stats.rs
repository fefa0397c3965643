// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Membership statistics for the landing page and the dashboard.
//!
//! Everything here is computed from the premium user list on each request;
//! there are no stored aggregates.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::config::PREMIUM_PRICE_CENTS;
use crate::models::User;
use crate::time_utils::month_label;

/// Number of recent purchasers shown on the landing page.
pub const RECENT_PREMIUM_LIMIT: usize = 5;

/// Public avatar entry for a recent purchaser.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RecentMember {
    pub display_name: String,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserStatsResponse {
    pub total_premium_users: u64,
    pub recent_premium_users: Vec<RecentMember>,
}

/// Cumulative member counts, one point per month of the current year.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MemberGrowth {
    pub labels: Vec<String>,
    pub data: Vec<u64>,
}

/// Map marker: members grouped by rounded coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VisitorLocation {
    pub lat: f64,
    pub lng: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DashboardStats {
    pub total_members: u64,
    pub total_revenue: f64,
    pub total_visitors: u64,
    pub member_growth: MemberGrowth,
    pub visitor_locations: Vec<VisitorLocation>,
}

/// Revenue in dollars for `members` premium purchases.
pub fn revenue_usd(members: u64) -> f64 {
    (members * PREMIUM_PRICE_CENTS) as f64 / 100.0
}

/// The most recent purchasers, newest first.
pub fn recent_members(premium_users: &[User], limit: usize) -> Vec<RecentMember> {
    let mut sorted: Vec<&User> = premium_users.iter().collect();
    sorted.sort_by(|a, b| b.purchase_date.cmp(&a.purchase_date));
    sorted
        .into_iter()
        .take(limit)
        .map(|u| RecentMember {
            display_name: u.display_name.clone(),
            profile_picture: u.profile_picture.clone(),
        })
        .collect()
}

impl UserStatsResponse {
    pub fn from_premium_users(premium_users: &[User]) -> Self {
        Self {
            total_premium_users: premium_users.len() as u64,
            recent_premium_users: recent_members(premium_users, RECENT_PREMIUM_LIMIT),
        }
    }
}

impl DashboardStats {
    pub fn compute(premium_users: &[User], total_visitors: u64, now: DateTime<Utc>) -> Self {
        let total_members = premium_users.len() as u64;
        Self {
            total_members,
            total_revenue: revenue_usd(total_members),
            total_visitors,
            member_growth: member_growth(premium_users, now),
            visitor_locations: visitor_locations(premium_users),
        }
    }
}

/// Cumulative premium member count at the end of each month of `now`'s year.
///
/// Members who purchased in earlier years form the starting baseline.
/// Premium users without a purchase date count toward the baseline.
pub fn member_growth(premium_users: &[User], now: DateTime<Utc>) -> MemberGrowth {
    let current_year = now.year();
    let current_month = now.month0() as usize;

    let mut baseline = 0u64;
    let mut per_month = vec![0u64; current_month + 1];

    for user in premium_users {
        match user.purchase_date {
            Some(date) if date.year() == current_year => {
                let month = date.month0() as usize;
                if month <= current_month {
                    per_month[month] += 1;
                }
            }
            Some(date) if date.year() > current_year => {}
            _ => baseline += 1,
        }
    }

    let mut running = baseline;
    let data = per_month
        .into_iter()
        .map(|count| {
            running += count;
            running
        })
        .collect();

    MemberGrowth {
        labels: (1..=current_month as u32 + 1)
            .map(|m| month_label(m).to_string())
            .collect(),
        data,
    }
}

/// Group located members by coordinates rounded to one decimal place.
pub fn visitor_locations(premium_users: &[User]) -> Vec<VisitorLocation> {
    let mut buckets: BTreeMap<(i64, i64), u64> = BTreeMap::new();

    for location in premium_users.iter().filter_map(|u| u.location.as_ref()) {
        if !location.lat.is_finite() || !location.lng.is_finite() {
            continue;
        }
        let key = (
            (location.lat * 10.0).round() as i64,
            (location.lng * 10.0).round() as i64,
        );
        *buckets.entry(key).or_insert(0) += 1;
    }

    buckets
        .into_iter()
        .map(|((lat, lng), count)| VisitorLocation {
            lat: lat as f64 / 10.0,
            lng: lng as f64 / 10.0,
            count,
        })
        .collect()
}
