//! Queries over a STIX bundle

use std::collections::HashSet;

use super::model::{StixBundle, StixObject, Technique, ThreatActor, ATTACK_PATTERN, INTRUSION_SET, RELATIONSHIP, USES};

/// Every intrusion set in the bundle
pub fn threat_actors(bundle: &StixBundle) -> Vec<ThreatActor> {
    bundle
        .objects_of_type(INTRUSION_SET)
        .map(ThreatActor::from_intrusion_set)
        .collect()
}

/// Find an intrusion set by STIX id, name or alias (case-insensitive)
pub fn find_actor<'a>(bundle: &'a StixBundle, query: &str) -> Option<&'a StixObject> {
    let query = query.trim();
    bundle.objects_of_type(INTRUSION_SET).find(|actor| {
        actor.id.eq_ignore_ascii_case(query)
            || actor
                .name
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(query))
            || actor.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(query))
    })
}

/// Techniques an actor `uses`, in bundle order
pub fn techniques_for_actor(bundle: &StixBundle, actor_id: &str) -> Vec<Technique> {
    let used: HashSet<&str> = bundle
        .objects_of_type(RELATIONSHIP)
        .filter(|rel| {
            rel.relationship_type.as_deref() == Some(USES) && rel.source_ref.as_deref() == Some(actor_id)
        })
        .filter_map(|rel| rel.target_ref.as_deref())
        .collect();

    bundle
        .objects_of_type(ATTACK_PATTERN)
        .filter(|t| used.contains(t.id.as_str()))
        .map(Technique::from_attack_pattern)
        .collect()
}

/// Every technique in the bundle, in bundle order
pub fn all_techniques(bundle: &StixBundle) -> Vec<Technique> {
    bundle
        .objects_of_type(ATTACK_PATTERN)
        .map(Technique::from_attack_pattern)
        .collect()
}

/// Keep the techniques that declare `platform`, preserving order
pub fn filter_by_platform(techniques: &[Technique], platform: &str) -> Vec<Technique> {
    techniques
        .iter()
        .filter(|t| t.supports_platform(platform))
        .cloned()
        .collect()
}
