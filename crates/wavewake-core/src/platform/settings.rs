//! Storage-backed preference and system setting lookups

use std::rc::Rc;
use wavewake_storage::{Database, PreferenceKey};

use super::{PreferenceStore, SystemSettings};

impl PreferenceStore for Database {
    fn get_bool(&self, key: PreferenceKey, default: bool) -> bool {
        Self::get_bool(self, key, default).unwrap_or_else(|e| {
            log::warn!("Failed to read preference {key}: {e:#}");
            default
        })
    }
}

impl SystemSettings for Database {
    fn get_int(&self, name: &str, default: i64) -> i64 {
        Self::get_int(self, name, default).unwrap_or_else(|e| {
            log::warn!("Failed to read setting {name}: {e:#}");
            default
        })
    }
}

impl<T: PreferenceStore + ?Sized> PreferenceStore for Rc<T> {
    fn get_bool(&self, key: PreferenceKey, default: bool) -> bool {
        PreferenceStore::get_bool(&**self, key, default)
    }
}

impl<T: SystemSettings + ?Sized> SystemSettings for Rc<T> {
    fn get_int(&self, name: &str, default: i64) -> i64 {
        SystemSettings::get_int(&**self, name, default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wavewake_storage::DOZE_ENABLED_SETTING;

    #[test]
    fn test_database_preferences_through_trait() {
        let db = Rc::new(Database::open_in_memory().unwrap());
        db.set_bool(PreferenceKey::Pocket, true).unwrap();

        let store: Box<dyn PreferenceStore> = Box::new(Rc::clone(&db));
        assert!(store.get_bool(PreferenceKey::Pocket, false));
        assert!(!store.get_bool(PreferenceKey::HandWave, false));
    }

    #[test]
    fn test_database_settings_are_read_every_time() {
        let db = Rc::new(Database::open_in_memory().unwrap());
        let settings: Box<dyn SystemSettings> = Box::new(Rc::clone(&db));
        assert_eq!(settings.get_int(DOZE_ENABLED_SETTING, 1), 1);

        db.set_int(DOZE_ENABLED_SETTING, 0).unwrap();
        assert_eq!(settings.get_int(DOZE_ENABLED_SETTING, 1), 0);
    }
}
