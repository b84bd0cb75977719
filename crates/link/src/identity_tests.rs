// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::state::SessionSnapshot;

use super::Identity;

#[yare::parameterized(
    applicant_only = { Some("u1"), None, Some(("applicant", "u1")) },
    organization_only = { None, Some("c1"), Some(("organization", "c1")) },
    both_prefers_applicant = { Some("u1"), Some("c1"), Some(("applicant", "u1")) },
    absent = { None, None, None },
)]
fn resolve_precedence(
    applicant: Option<&str>,
    organization: Option<&str>,
    expect: Option<(&str, &str)>,
) {
    let snapshot = SessionSnapshot {
        applicant_id: applicant.map(str::to_owned),
        organization_id: organization.map(str::to_owned),
    };
    let resolved =
        Identity::resolve(&snapshot).map(|i| (i.client_type(), i.client_id().to_owned()));
    assert_eq!(resolved, expect.map(|(t, id)| (t, id.to_owned())));
}

#[test]
fn only_applicants_subscribe() {
    assert!(Identity::Applicant { id: "u1".to_owned() }.is_applicant());
    assert!(!Identity::Organization { id: "c1".to_owned() }.is_applicant());
}

#[test]
fn resolve_is_side_effect_free() {
    let snapshot = SessionSnapshot {
        applicant_id: Some("u1".to_owned()),
        organization_id: Some("c1".to_owned()),
    };
    let first = Identity::resolve(&snapshot);
    let second = Identity::resolve(&snapshot);
    assert_eq!(first, second);
}
