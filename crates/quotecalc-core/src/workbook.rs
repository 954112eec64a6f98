//! Workbook type - the document that owns the sheets

use crate::error::{Error, Result};
use crate::worksheet::Worksheet;
use crate::MAX_SHEET_NAME_LEN;

/// An ordered set of uniquely named worksheets
#[derive(Debug, Clone)]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
}

impl Workbook {
    /// Create a workbook with a single sheet named `Sheet1`
    pub fn new() -> Self {
        Self {
            worksheets: vec![Worksheet::new("Sheet1")],
        }
    }

    /// Create a workbook with no sheets
    pub fn empty() -> Self {
        Self {
            worksheets: Vec::new(),
        }
    }

    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worksheets.is_empty()
    }

    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    pub fn worksheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(index)
    }

    /// Look a sheet up by its exact name; absence is not an error
    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.worksheets.iter().find(|ws| ws.name() == name)
    }

    pub fn worksheet_by_name_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.worksheets.iter_mut().find(|ws| ws.name() == name)
    }

    /// Like [`Workbook::worksheet_by_name`], but a missing sheet is [`Error::SheetNotFound`]
    pub fn require_sheet(&self, name: &str) -> Result<&Worksheet> {
        self.worksheet_by_name(name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }

    pub fn require_sheet_mut(&mut self, name: &str) -> Result<&mut Worksheet> {
        self.worksheet_by_name_mut(name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }

    /// Index of a sheet by exact name
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.worksheets.iter().position(|ws| ws.name() == name)
    }

    /// Index of a sheet, matching the name case-insensitively
    ///
    /// Formula references such as `fc!B13` resolve this way.
    pub fn sheet_index_ignore_case(&self, name: &str) -> Option<usize> {
        self.sheet_index(name).or_else(|| {
            self.worksheets
                .iter()
                .position(|ws| ws.name().eq_ignore_ascii_case(name))
        })
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.worksheets.iter().map(|ws| ws.name())
    }

    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    pub fn worksheets_mut(&mut self) -> impl Iterator<Item = &mut Worksheet> {
        self.worksheets.iter_mut()
    }

    /// Append a new empty sheet, returning its index
    pub fn add_worksheet_with_name(&mut self, name: &str) -> Result<usize> {
        self.validate_sheet_name(name, None)?;
        self.worksheets.push(Worksheet::new(name));
        Ok(self.worksheets.len() - 1)
    }

    /// Append an already populated sheet, returning its index
    pub fn add_existing_worksheet(&mut self, worksheet: Worksheet) -> Result<usize> {
        self.validate_sheet_name(worksheet.name(), None)?;
        self.worksheets.push(worksheet);
        Ok(self.worksheets.len() - 1)
    }

    /// Remove a sheet by index
    pub fn remove_worksheet(&mut self, index: usize) -> Result<Worksheet> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetNotFound(format!("#{}", index)));
        }
        Ok(self.worksheets.remove(index))
    }

    /// Rename a sheet; the new name must be valid and unique
    pub fn rename_worksheet(&mut self, index: usize, new_name: &str) -> Result<()> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetNotFound(format!("#{}", index)));
        }
        self.validate_sheet_name(new_name, Some(index))?;
        self.worksheets[index].set_name(new_name);
        Ok(())
    }

    fn validate_sheet_name(&self, name: &str, exclude_index: Option<usize>) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name too long (max {} characters)",
                MAX_SHEET_NAME_LEN
            )));
        }

        const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name cannot contain '{}'",
                c
            )));
        }

        let name_lower = name.to_lowercase();
        let clash = self
            .worksheets
            .iter()
            .enumerate()
            .any(|(i, ws)| Some(i) != exclude_index && ws.name().to_lowercase() == name_lower);
        if clash {
            return Err(Error::DuplicateSheetName(name.into()));
        }

        Ok(())
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}
