use std::sync::Arc;

mod auth;
mod contributions;
mod db;
mod progress;

pub mod catalog;
pub mod util;

pub use auth::*;
pub use catalog::{Catalog, CatalogError, CurriculumDocument, ImportSummary, Question, QuestionKind};
pub use contributions::*;
pub use db::*;
pub use progress::*;

/// The main karatu type, which manages all state
pub struct Karatu<Db> {
    context: KaratuContext<Db>,

    pub auth: Auth<Db>,
    pub catalog: Catalog<Db>,
    pub progress: ProgressEngine<Db>,
    pub moderation: Moderation<Db>,
}

/// A struct of all utilities necessary for karatu to work
pub struct KaratuContext<Db> {
    pub database: Arc<Db>,
}

impl<Db> Karatu<Db>
where
    Db: Database,
{
    pub fn new(database: Db, config: ProgressConfig) -> Self {
        let context = KaratuContext {
            database: Arc::new(database),
        };

        Self {
            auth: Auth::new(&context),
            catalog: Catalog::new(&context),
            progress: ProgressEngine::new(&context, config),
            moderation: Moderation::new(&context),
            context,
        }
    }

    pub fn database(&self) -> &Db {
        &self.context.database
    }
}

impl<Db> Clone for KaratuContext<Db> {
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
        }
    }
}
