//! Record drawer, form state and the delete confirmation.

use serde_json::{Map, Value};

use backoffice_core::RowId;

use crate::error::FieldErrors;
use crate::types::Row;

/// Form fields grouped into ordered tabs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormLayout {
    tabs: Vec<(String, Vec<String>)>,
}

impl FormLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tab<I, S>(mut self, name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tabs
            .push((name.into(), fields.into_iter().map(Into::into).collect()));
        self
    }

    pub fn tab_names(&self) -> impl Iterator<Item = &str> {
        self.tabs.iter().map(|(name, _)| name.as_str())
    }

    pub fn tab_of(&self, field: &str) -> Option<usize> {
        self.tabs
            .iter()
            .position(|(_, fields)| fields.iter().any(|f| f == field))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    values: Map<String, Value>,
    errors: FieldErrors,
    active_tab: usize,
}

impl FormState {
    pub fn from_row(row: &Row) -> Self {
        Self {
            values: row.attributes.clone(),
            ..Self::default()
        }
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Editing a field clears its server error.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        self.errors.remove(&field);
        self.values.insert(field, value.into());
    }

    /// Request body for create/update.
    pub fn body(&self) -> Value {
        Value::Object(self.values.clone())
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn active_tab(&self) -> usize {
        self.active_tab
    }

    pub fn set_tab(&mut self, tab: usize) {
        self.active_tab = tab;
    }

    /// Show server validation errors and jump to the first tab that has one.
    pub fn apply_errors(&mut self, errors: FieldErrors, layout: &FormLayout) {
        if let Some(tab) = errors.fields().filter_map(|f| layout.tab_of(f)).min() {
            self.active_tab = tab;
        }
        self.errors = errors;
    }
}

/// Drawer visibility and what it was opened for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionsState {
    pub visible: bool,
    pub id: Option<RowId>,
    pub is_duplicate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(RowId),
    /// Pre-filled from an existing row; saving creates a new one.
    Duplicate(RowId),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Drawer {
    actions: ActionsState,
    form: FormState,
}

impl Drawer {
    pub fn is_open(&self) -> bool {
        self.actions.visible
    }

    pub fn actions(&self) -> ActionsState {
        self.actions
    }

    pub fn mode(&self) -> FormMode {
        match self.actions {
            ActionsState { id: Some(id), is_duplicate: true, .. } => FormMode::Duplicate(id),
            ActionsState { id: Some(id), .. } => FormMode::Edit(id),
            ActionsState { id: None, .. } => FormMode::Create,
        }
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormState {
        &mut self.form
    }

    pub fn open_create(&mut self) {
        self.actions = ActionsState {
            visible: true,
            id: None,
            is_duplicate: false,
        };
        self.form = FormState::default();
    }

    pub fn open_edit(&mut self, row: &Row) {
        self.actions = ActionsState {
            visible: true,
            id: Some(row.id),
            is_duplicate: false,
        };
        self.form = FormState::from_row(row);
    }

    pub fn open_duplicate(&mut self, row: &Row) {
        self.actions = ActionsState {
            visible: true,
            id: Some(row.id),
            is_duplicate: true,
        };
        self.form = FormState::from_row(row);
    }

    pub fn close(&mut self) {
        self.actions = ActionsState::default();
        self.form = FormState::default();
    }
}

/// Pending delete confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteState {
    open: bool,
    ids: Vec<RowId>,
}

impl DeleteState {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn ids(&self) -> &[RowId] {
        &self.ids
    }

    /// Ask to delete one row or a selection. An empty selection is ignored.
    pub fn request(&mut self, ids: impl IntoIterator<Item = RowId>) {
        self.ids = ids.into_iter().collect();
        self.ids.sort_unstable();
        self.ids.dedup();
        self.open = !self.ids.is_empty();
    }

    pub fn cancel(&mut self) {
        self.open = false;
        self.ids.clear();
    }

    /// Close the dialog, handing back what to delete.
    pub fn confirm(&mut self) -> Option<Vec<RowId>> {
        if !self.open {
            return None;
        }
        self.open = false;
        Some(std::mem::take(&mut self.ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layout() -> FormLayout {
        FormLayout::new()
            .tab("General", ["name", "email"])
            .tab("Billing", ["vat", "iban"])
    }

    #[test]
    fn errors_activate_the_first_tab_with_a_problem() {
        let mut form = FormState::default();
        form.set_tab(0);
        form.apply_errors(FieldErrors::new().with("iban", "Invalid IBAN"), &layout());
        assert_eq!(form.active_tab(), 1);
        assert_eq!(form.errors().first("iban"), Some("Invalid IBAN"));

        form.apply_errors(
            FieldErrors::new().with("vat", "Required").with("email", "Taken"),
            &layout(),
        );
        assert_eq!(form.active_tab(), 0);
    }

    #[test]
    fn unknown_error_fields_keep_the_tab() {
        let mut form = FormState::default();
        form.set_tab(1);
        form.apply_errors(FieldErrors::new().with("general", "Oops"), &layout());
        assert_eq!(form.active_tab(), 1);
    }

    #[test]
    fn editing_a_field_clears_its_error() {
        let mut form = FormState::default();
        form.apply_errors(FieldErrors::new().with("name", "Required"), &layout());
        form.set("name", "Acme");
        assert!(form.errors().is_empty());
        assert_eq!(form.body(), json!({ "name": "Acme" }));
    }

    #[test]
    fn drawer_modes() {
        let row = Row::new(7).attr("name", "Acme");
        let mut drawer = Drawer::default();
        assert!(!drawer.is_open());

        drawer.open_edit(&row);
        assert_eq!(drawer.mode(), FormMode::Edit(RowId::new(7)));
        assert_eq!(drawer.form().get("name"), Some(&json!("Acme")));

        drawer.open_duplicate(&row);
        assert_eq!(drawer.mode(), FormMode::Duplicate(RowId::new(7)));

        drawer.open_create();
        assert_eq!(drawer.mode(), FormMode::Create);
        assert!(drawer.form().values().is_empty());

        drawer.close();
        assert!(!drawer.is_open());
    }

    #[test]
    fn delete_confirmation_hands_back_ids_once() {
        let mut delete = DeleteState::default();
        delete.request([RowId::new(3), RowId::new(1), RowId::new(3)]);
        assert!(delete.is_open());
        assert_eq!(delete.confirm(), Some(vec![RowId::new(1), RowId::new(3)]));
        assert_eq!(delete.confirm(), None);

        delete.request([RowId::new(2)]);
        delete.cancel();
        assert_eq!(delete.confirm(), None);

        delete.request([]);
        assert!(!delete.is_open());
    }
}
