//! Local contact list with write-through persistence.
//!
//! Every mutation rewrites the whole list as a JSON array to the backing file.
//! Phones are the unique key; adding a phone that already exists is a silent no-op.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use regex::Regex;

use crate::{
    domain::{Contact, ContactStatus},
    errors::Error,
    phone::{digits_only, is_valid_phone, normalize_phone, split_phone, MIN_PHONE_LEN},
    Result,
};

/// Fields editable on an existing contact.
#[derive(Clone, Debug, Default)]
pub struct ContactEdit {
    pub country_code: String,
    pub local_number: String,
    pub name: String,
}

#[derive(Debug)]
pub struct ContactStore {
    contacts: Vec<Contact>,
    path: Option<PathBuf>,
    default_country_code: String,
}

impl ContactStore {
    /// A store that never touches disk (tests, dry runs).
    pub fn in_memory(default_country_code: impl Into<String>) -> Self {
        Self {
            contacts: Vec::new(),
            path: None,
            default_country_code: default_country_code.into(),
        }
    }

    /// Hydrate from `path`. A missing file yields an empty list.
    pub fn load(path: impl Into<PathBuf>, default_country_code: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let mut contacts = match fs::read_to_string(&path) {
            Ok(txt) if txt.trim().is_empty() => Vec::new(),
            Ok(txt) => serde_json::from_str::<Vec<Contact>>(&txt)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(Error::Io(e)),
        };

        // Older records only carried `phone`.
        for c in contacts.iter_mut() {
            if c.country_code.is_empty() && c.local_number.is_empty() {
                let parts = split_phone(&c.phone);
                c.country_code = parts.country_code;
                c.local_number = parts.local_number;
            }
        }

        tracing::debug!(path = %path.display(), count = contacts.len(), "loaded contacts");
        Ok(Self {
            contacts,
            path: Some(path),
            default_country_code: default_country_code.into(),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn default_country_code(&self) -> &str {
        &self.default_country_code
    }

    pub fn set_default_country_code(&mut self, cc: impl Into<String>) {
        self.default_country_code = cc.into();
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Contact> {
        self.contacts.get(index)
    }

    pub fn find(&self, phone: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.phone == phone)
    }

    /// Selected contacts with a usable phone, in list order.
    pub fn selected_valid(&self) -> Vec<Contact> {
        self.contacts
            .iter()
            .filter(|c| c.selected && c.is_valid())
            .cloned()
            .collect()
    }

    pub fn selected_count(&self) -> usize {
        self.contacts.iter().filter(|c| c.selected).count()
    }

    pub fn all_selected(&self) -> bool {
        !self.contacts.is_empty() && self.contacts.iter().all(|c| c.selected)
    }

    /// Add free-form phone numbers separated by newlines or commas.
    pub fn add_lines(&mut self, text: &str) -> Result<usize> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::validation("Please enter phone numbers"));
        }

        let mut added = 0usize;
        for entry in text.split(['\n', ',']) {
            let cleaned: String = entry
                .trim()
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '+')
                .collect();
            let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
            if self.insert(cleaned, "") {
                added += 1;
            }
        }

        if added > 0 {
            self.persist()?;
        }
        Ok(added)
    }

    /// Import contacts from CSV text. See [`parse_csv_rows`] for the column heuristic.
    pub fn import_csv(&mut self, text: &str) -> Result<usize> {
        let mut added = 0usize;
        for (phone, name) in parse_csv_rows(text) {
            if self.insert(&phone, &name) {
                added += 1;
            }
        }
        if added > 0 {
            self.persist()?;
        }
        Ok(added)
    }

    /// Add a single contact. Returns `false` when the phone is invalid or already present.
    pub fn add(&mut self, raw_phone: &str, name: &str) -> Result<bool> {
        let inserted = self.insert(raw_phone, name);
        if inserted {
            self.persist()?;
        }
        Ok(inserted)
    }

    pub fn edit(&mut self, index: usize, fields: ContactEdit) -> Result<()> {
        let country_code = digits_only(fields.country_code.trim());
        let local_number = digits_only(fields.local_number.trim());
        if local_number.len() < MIN_PHONE_LEN {
            return Err(Error::validation(
                "Please enter a valid phone number (at least 10 digits)",
            ));
        }
        let phone = format!("{country_code}{local_number}");

        if self
            .contacts
            .iter()
            .enumerate()
            .any(|(i, c)| i != index && c.phone == phone)
        {
            return Err(Error::validation(format!("{phone} is already in the list")));
        }

        let contact = self.contact_mut(index)?;
        contact.country_code = country_code;
        contact.local_number = local_number;
        contact.phone = phone;
        contact.name = fields.name.trim().to_string();
        self.persist()
    }

    pub fn remove(&mut self, index: usize) -> Result<Contact> {
        self.contact_mut(index)?;
        let removed = self.contacts.remove(index);
        self.persist()?;
        Ok(removed)
    }

    pub fn remove_selected(&mut self) -> Result<usize> {
        let before = self.contacts.len();
        self.contacts.retain(|c| !c.selected);
        let removed = before - self.contacts.len();
        if removed == 0 {
            return Err(Error::validation("No contacts selected"));
        }
        self.persist()?;
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<usize> {
        if self.contacts.is_empty() {
            return Err(Error::validation("No contacts to clear"));
        }
        let n = self.contacts.len();
        self.contacts.clear();
        self.persist()?;
        Ok(n)
    }

    pub fn toggle_select(&mut self, index: usize) -> Result<bool> {
        let contact = self.contact_mut(index)?;
        contact.selected = !contact.selected;
        let now = contact.selected;
        self.persist()?;
        Ok(now)
    }

    pub fn select_all(&mut self) -> Result<()> {
        self.set_all_selected(true)
    }

    pub fn set_all_selected(&mut self, selected: bool) -> Result<()> {
        for c in self.contacts.iter_mut() {
            c.selected = selected;
        }
        self.persist()
    }

    /// Overwrite the status of the contact keyed by `phone`.
    ///
    /// Returns `false` if the contact has been removed in the meantime.
    pub fn set_status(&mut self, phone: &str, status: ContactStatus) -> Result<bool> {
        let Some(contact) = self.contacts.iter_mut().find(|c| c.phone == phone) else {
            return Ok(false);
        };
        contact.status = status;
        self.persist()?;
        Ok(true)
    }

    fn insert(&mut self, raw_phone: &str, name: &str) -> bool {
        let phone = normalize_phone(raw_phone, &self.default_country_code);
        if !is_valid_phone(&phone) || self.contacts.iter().any(|c| c.phone == phone) {
            return false;
        }
        self.contacts.push(Contact::new(phone, name));
        true
    }

    fn contact_mut(&mut self, index: usize) -> Result<&mut Contact> {
        let len = self.contacts.len();
        self.contacts
            .get_mut(index)
            .ok_or_else(|| Error::validation(format!("no contact at index {index} (have {len})")))
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let txt = serde_json::to_string(&self.contacts)?;
        fs::write(path, txt)?;
        Ok(())
    }
}

/// Split CSV text into `(raw_phone, name)` rows.
///
/// The first non-empty line is dropped when it looks like a header. For
/// two-or-more column rows, the first column is the phone if it looks like one,
/// otherwise the second column is. This column sniffing can misclassify (for
/// example a name made only of digits) and is kept as-is.
pub fn parse_csv_rows(text: &str) -> Vec<(String, String)> {
    let mut rows = Vec::new();
    let mut first = true;

    for line in text.split('\n') {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if first {
            first = false;
            let lower = line.to_lowercase();
            if lower.contains("phone") || lower.contains("name") || lower.contains("number") {
                continue;
            }
        }

        let parts: Vec<String> = line.split(',').map(|p| unquote(p.trim())).collect();
        let (phone, name) = match parts.as_slice() {
            [only] => (strip_phone_punct(only), String::new()),
            [a, b, ..] => {
                if looks_like_phone(a) {
                    (strip_phone_punct(a), b.clone())
                } else {
                    (strip_phone_punct(b), a.clone())
                }
            }
            [] => continue,
        };
        rows.push((phone, name));
    }
    rows
}

fn phone_field_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+?\d{10,}$").expect("valid regex"))
}

fn looks_like_phone(field: &str) -> bool {
    let compact: String = field.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    phone_field_re().is_match(&compact)
}

fn strip_phone_punct(field: &str) -> String {
    field
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '+')
        .collect()
}

/// Drop one leading and one trailing quote character.
fn unquote(s: &str) -> String {
    let s = s.strip_prefix(['"', '\'']).unwrap_or(s);
    let s = s.strip_suffix(['"', '\'']).unwrap_or(s);
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_lines_normalizes_and_splits() {
        let mut store = ContactStore::in_memory("91");
        let added = store.add_lines("9876543210").unwrap();
        assert_eq!(added, 1);
        let c = &store.contacts()[0];
        assert_eq!(c.phone, "919876543210");
        assert_eq!(c.country_code, "91");
        assert_eq!(c.local_number, "9876543210");
        assert_eq!(c.status, ContactStatus::Pending);
        assert!(!c.selected);
    }

    #[test]
    fn add_lines_accepts_commas_newlines_and_plus() {
        let mut store = ContactStore::in_memory("91");
        let added = store
            .add_lines("+44 7700 900123, 9876543210\n\n 98765 43211 ,123")
            .unwrap();
        assert_eq!(added, 3);
        let phones: Vec<_> = store.contacts().iter().map(|c| c.phone.as_str()).collect();
        assert_eq!(phones, vec!["447700900123", "919876543210", "919876543211"]);
    }

    #[test]
    fn duplicate_phones_are_dropped_silently() {
        let mut store = ContactStore::in_memory("91");
        assert_eq!(store.add_lines("9876543210").unwrap(), 1);
        assert_eq!(store.add_lines("919876543210\n09876543210").unwrap(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn empty_input_is_a_validation_error() {
        let mut store = ContactStore::in_memory("91");
        assert!(matches!(store.add_lines("   "), Err(Error::Validation(_))));
    }

    #[test]
    fn csv_skips_header_and_sniffs_columns() {
        let mut store = ContactStore::in_memory("91");
        let added = store.import_csv("name,phone\nAlice,9876543210\n").unwrap();
        assert_eq!(added, 1);
        let c = &store.contacts()[0];
        assert_eq!(c.name, "Alice");
        assert_eq!(c.phone, "919876543210");
    }

    #[test]
    fn csv_phone_first_quoted_and_single_column() {
        let rows = parse_csv_rows("\"+91 98765-43210\",'Bob'\r\n9876543211\n");
        assert_eq!(
            rows,
            vec![
                ("919876543210".to_string(), "Bob".to_string()),
                ("9876543211".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn csv_header_only_checked_on_first_line() {
        let rows = parse_csv_rows("Alice,9876543210\nPhone Guy,9876543211\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].1, "Phone Guy");
    }

    #[test]
    fn edit_recomputes_phone_and_rejects_short_numbers() {
        let mut store = ContactStore::in_memory("91");
        store.add_lines("9876543210").unwrap();
        store
            .edit(
                0,
                ContactEdit {
                    country_code: "+44".to_string(),
                    local_number: "7700 900 123".to_string(),
                    name: " Carol ".to_string(),
                },
            )
            .unwrap();
        let c = &store.contacts()[0];
        assert_eq!(c.phone, "447700900123");
        assert_eq!(c.country_code, "44");
        assert_eq!(c.name, "Carol");

        let err = store.edit(
            0,
            ContactEdit {
                local_number: "12345".to_string(),
                ..Default::default()
            },
        );
        assert!(matches!(err, Err(Error::Validation(_))));
    }

    #[test]
    fn edit_rejects_collision_with_another_contact() {
        let mut store = ContactStore::in_memory("91");
        store.add_lines("9876543210\n9876543211").unwrap();
        let err = store.edit(
            1,
            ContactEdit {
                country_code: "91".to_string(),
                local_number: "9876543210".to_string(),
                name: String::new(),
            },
        );
        assert!(matches!(err, Err(Error::Validation(_))));
    }

    #[test]
    fn selection_helpers() {
        let mut store = ContactStore::in_memory("91");
        store.add_lines("9876543210\n9876543211\n9876543212").unwrap();
        assert!(!store.all_selected());
        assert!(store.toggle_select(1).unwrap());
        assert_eq!(store.selected_count(), 1);
        store.select_all().unwrap();
        assert!(store.all_selected());
        assert_eq!(store.remove_selected().unwrap(), 3);
        assert!(store.is_empty());
        assert!(matches!(store.remove_selected(), Err(Error::Validation(_))));
        assert!(matches!(store.clear(), Err(Error::Validation(_))));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut store = ContactStore::in_memory("91");
        assert!(matches!(store.toggle_select(3), Err(Error::Validation(_))));
        assert!(matches!(store.remove(0), Err(Error::Validation(_))));
    }

    #[test]
    fn mutations_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/contacts.json");

        let mut store = ContactStore::load(&path, "91").unwrap();
        assert!(store.is_empty());
        store.import_csv("Alice,9876543210\nBob,9876543211").unwrap();
        store.toggle_select(0).unwrap();
        store.set_status("919876543211", ContactStatus::Failed).unwrap();

        let reloaded = ContactStore::load(&path, "91").unwrap();
        assert_eq!(reloaded.contacts(), store.contacts());
        assert!(reloaded.contacts()[0].selected);
        assert_eq!(reloaded.contacts()[1].status, ContactStatus::Failed);

        let mut reloaded = reloaded;
        reloaded.clear().unwrap();
        let txt = std::fs::read_to_string(&path).unwrap();
        assert_eq!(txt, "[]");
    }

    #[test]
    fn load_hydrates_missing_split_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contacts.json");
        std::fs::write(&path, r#"[{"phone":"14155550100","name":"Dan"}]"#).unwrap();
        let store = ContactStore::load(&path, "91").unwrap();
        let c = &store.contacts()[0];
        assert_eq!(c.country_code, "1");
        assert_eq!(c.local_number, "4155550100");
    }
}
