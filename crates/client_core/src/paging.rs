//! Server-paginated report queries.

use shared::{
    domain::StudentId,
    error::ValidationError,
    protocol::{ReportPage, ReportRequest},
};

use crate::{controller::Phase, validation::parse_student_id};

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilters {
    pub student_id: Option<StudentId>,
    pub class_name: Option<String>,
}

impl ReportFilters {
    /// Builds filters from raw form values; blanks mean "unfiltered".
    pub fn parse(student_id: &str, class_name: &str) -> Result<Self, ValidationError> {
        let class_name = class_name.trim();
        Ok(Self {
            student_id: parse_student_id(student_id)?,
            class_name: (!class_name.is_empty()).then(|| class_name.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedQuery {
    pub page_index: u32,
    pub page_size: u32,
    pub filters: ReportFilters,
}

impl Default for PagedQuery {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
            filters: ReportFilters::default(),
        }
    }
}

impl PagedQuery {
    pub fn to_request(&self) -> ReportRequest {
        ReportRequest {
            page: self.page_index,
            size: self.page_size,
            student_id: self.filters.student_id,
            class_name: self.filters.class_name.clone(),
        }
    }

    /// The `name -> value` mapping sent as query parameters.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        self.to_request().query_pairs()
    }

    pub fn page_count(&self, total_elements: u64) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        total_elements.div_ceil(u64::from(self.page_size))
    }

    /// Adopts the paging the server actually applied.
    pub fn adopt(&mut self, page: &ReportPage) {
        self.page_index = page.current_page;
        if page.page_size > 0 {
            self.page_size = page.page_size;
        }
    }
}

pub fn validate_request(request: &ReportRequest) -> Result<(), ValidationError> {
    if request.size == 0 {
        return Err(ValidationError::InvalidPageSize);
    }
    Ok(())
}

/// What a listing screen should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingView {
    NotLoaded,
    Loading,
    Rows,
    /// A successful fetch that matched nothing.
    NoData,
    Error(String),
}

impl ListingView {
    pub fn from_phase(phase: Phase, row_count: usize, error: Option<&str>) -> Self {
        match phase {
            Phase::Idle => ListingView::NotLoaded,
            Phase::Validating | Phase::Running => ListingView::Loading,
            Phase::Failed => ListingView::Error(error.unwrap_or_default().to_string()),
            Phase::Succeeded if row_count == 0 => ListingView::NoData,
            Phase::Succeeded => ListingView::Rows,
        }
    }
}
