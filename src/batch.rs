//! Batch driver: discover PDFs, process each, export one table.
//!
//! Files are processed strictly one after another. A failure in one file is
//! logged and that file is left out of the table; the batch carries on.

use crate::error::Result;
use crate::metadata::file_name;
use crate::pipeline::PaperPipeline;
use crate::record::{PaperRecord, ResultTable};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// How a batch run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The input folder did not exist and has just been created
    FolderCreated,
    /// The input folder holds no PDFs
    NoPdfs,
    /// Every file was attempted; `written` rows went to the output file
    /// (zero means no file was written)
    Completed { written: usize },
}

/// `*.pdf` files directly inside `folder`, sorted by path. Hidden files are
/// skipped.
pub fn discover_pdfs(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        let is_pdf = path.extension().is_some_and(|ext| ext == "pdf");
        let is_hidden = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.'));
        if is_pdf && !is_hidden && path.is_file() {
            pdfs.push(path);
        }
    }
    pdfs.sort();
    Ok(pdfs)
}

/// Run the whole batch over `pdf_folder`, writing the table to `output_csv`.
pub async fn run_batch(
    pipeline: &PaperPipeline,
    pdf_folder: &Path,
    output_csv: &Path,
) -> Result<BatchOutcome> {
    if !pdf_folder.exists() {
        std::fs::create_dir_all(pdf_folder)?;
        warn!(
            folder = %pdf_folder.display(),
            "Created input folder. Please add your research papers and run again."
        );
        return Ok(BatchOutcome::FolderCreated);
    }

    let pdf_files = discover_pdfs(pdf_folder)?;
    if pdf_files.is_empty() {
        warn!(folder = %pdf_folder.display(), "No PDF files found. Please add some papers.");
        return Ok(BatchOutcome::NoPdfs);
    }

    info!(count = pdf_files.len(), "Found PDF(s) to process");

    let total = pdf_files.len();
    let mut records: Vec<PaperRecord> = Vec::with_capacity(total);
    for (idx, path) in pdf_files.iter().enumerate() {
        let filename = file_name(path);
        info!("[{}/{}] {}", idx + 1, total, filename);

        match pipeline.process_paper(path).await {
            Ok(record) => {
                info!(file = %filename, "Successfully processed");
                records.push(record);
            }
            Err(e) => {
                error!(file = %filename, error = %e, "Unhandled error, skipping file");
            }
        }
    }

    if records.is_empty() {
        warn!("No papers were successfully processed.");
        return Ok(BatchOutcome::Completed { written: 0 });
    }

    let table = ResultTable::from_records(&records);
    table.write_csv(output_csv)?;
    info!(
        path = %output_csv.display(),
        rows = table.rows().len(),
        "Processing complete"
    );

    Ok(BatchOutcome::Completed {
        written: table.rows().len(),
    })
}
