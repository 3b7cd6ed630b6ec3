mod article;
mod page;

pub use article::Article;
pub use page::{Page, PageSummary, Surrounding};
