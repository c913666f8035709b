use super::*;

mod crossref;
mod google_books;
mod ia_download;
mod worldcat;
