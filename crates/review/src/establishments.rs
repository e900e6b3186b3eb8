use api_types::establishment::Establishment;

use crate::form::ReviewForm;

/// Returns the store name of the first establishment whose `nit` equals
/// `identifier`.
///
/// `identifier` must already be normalized; no normalization happens here.
pub fn resolve<'a>(identifier: &str, establishments: &'a [Establishment]) -> Option<&'a str> {
    establishments
        .iter()
        .find(|establishment| establishment.nit == identifier)
        .map(|establishment| establishment.name_store.as_str())
}

/// Overwrites `form.name` when `identifier` matches an establishment; leaves
/// it untouched otherwise. Returns whether a match was found.
pub fn autofill_on_identifier_change(
    form: &mut ReviewForm,
    identifier: &str,
    establishments: &[Establishment],
) -> bool {
    match resolve(identifier, establishments) {
        Some(name) => {
            tracing::debug!(identifier, name, "establishment matched");
            form.name = name.to_string();
            true
        }
        None => false,
    }
}

/// Establishments loaded for the current session.
#[derive(Debug, Clone, Default)]
pub struct EstablishmentCache {
    items: Vec<Establishment>,
    loaded: bool,
}

impl EstablishmentCache {
    pub fn replace(&mut self, items: Vec<Establishment>) {
        self.items = items;
        self.loaded = true;
    }

    pub fn as_slice(&self) -> &[Establishment] {
        &self.items
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
