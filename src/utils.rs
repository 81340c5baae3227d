use crate::constants;
use rand::{distributions::Alphanumeric, Rng};
use std::collections::{BTreeMap, BTreeSet};

pub fn common_lables(name: &str) -> BTreeMap<String, String> {
    let mut labels = selector_labels(name);
    labels.insert(constants::LABEL_KUBERNETES_NAME.to_owned(), constants::COMPONENT_TYPE.to_owned());
    labels.insert(constants::LABEL_KUBERNETES_INSTANCE.to_owned(), name.to_owned());
    labels.insert(constants::LABEL_KUBERNETES_COMPONENT.to_owned(), "console".to_owned());
    labels.insert(constants::LABEL_KUBERNETES_MANAGED_BY.to_owned(), constants::OPERATOR_NAME.to_owned());
    labels
}

/// Labels used to select the console pods
pub fn selector_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(constants::LABEL_APP.to_owned(), name.to_owned())])
}

pub fn random_password(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

pub fn contains_empty(values: &[&str]) -> bool {
    values.iter().any(|value| value.trim().is_empty())
}

/// Order insensitive comparison of two string lists
pub fn same_members(left: &[String], right: &[String]) -> bool {
    left.iter().collect::<BTreeSet<_>>() == right.iter().collect::<BTreeSet<_>>()
}
