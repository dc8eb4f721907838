//! Dispatch contract tests with mocked capabilities
//!
//! Every importer follows the same contract: parameters rejected → exactly one
//! interactive retry, plugin absent → no retry, domain error → diagnosis.

use meshport::host::{
    CapabilityError, DomainCode, DomainError, ImportInvocation, ImporterHost,
};
use meshport::models::{FormatKind, ImportSettings};
use meshport::services::{Diagnosis, ImportOutcome, ImportRequest, ImportService};
use meshport::StateManager;
use mockall::{Sequence, mock};
use std::sync::Arc;

mock! {
    pub Importer {}

    impl ImporterHost for Importer {
        fn import(&mut self, invocation: &ImportInvocation) -> Result<(), CapabilityError>;
    }
}

fn service() -> ImportService {
    ImportService::new(ImportSettings::default(), Arc::new(StateManager::new()))
}

#[test]
fn test_retry_happens_exactly_once() {
    let mut importer = MockImporter::new();
    let mut seq = Sequence::new();

    importer
        .expect_import()
        .withf(|invocation| !invocation.is_interactive())
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(CapabilityError::ParameterRejected("bad keyword".to_string())));
    importer
        .expect_import()
        .withf(|invocation| *invocation == ImportInvocation::Interactive(FormatKind::Dae))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));

    let outcome = service().import_one(&mut importer, &ImportRequest::new("/in", "scene.dae"));

    assert_eq!(
        outcome,
        ImportOutcome::Imported {
            format: FormatKind::Dae,
            interactive: true,
        }
    );
}

#[test]
fn test_second_rejection_is_reported() {
    let mut importer = MockImporter::new();
    importer
        .expect_import()
        .times(2)
        .returning(|_| Err(CapabilityError::ParameterRejected("bad keyword".to_string())));

    let outcome = service().import_one(&mut importer, &ImportRequest::new("/in", "body.smd"));

    assert_eq!(
        outcome,
        ImportOutcome::Failed {
            format: FormatKind::SourceEngine,
            diagnosis: Diagnosis::Rejected("bad keyword".to_string()),
        }
    );
}

#[test]
fn test_absent_capability_never_retries() {
    let mut importer = MockImporter::new();
    importer
        .expect_import()
        .times(1)
        .returning(|_| Err(CapabilityError::Absent));

    let outcome = service().import_one(&mut importer, &ImportRequest::new("/in", "a.pmx"));

    assert_eq!(
        outcome,
        ImportOutcome::MissingCapability {
            format: FormatKind::Mmd
        }
    );
}

#[test]
fn test_absent_after_retry_is_missing_capability() {
    let mut importer = MockImporter::new();
    let mut seq = Sequence::new();
    importer
        .expect_import()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(CapabilityError::ParameterRejected("old api".to_string())));
    importer
        .expect_import()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(CapabilityError::Absent));

    let outcome = service().import_one(&mut importer, &ImportRequest::new("/in", "a.vrm"));

    assert_eq!(
        outcome,
        ImportOutcome::MissingCapability {
            format: FormatKind::Vrm
        }
    );
}

#[test]
fn test_structured_domain_code_is_used() {
    let mut importer = MockImporter::new();
    importer.expect_import().times(1).returning(|_| {
        Err(CapabilityError::Domain(DomainError {
            message: "PMX 1.0 is not supported".to_string(),
            code: Some(DomainCode::UnsupportedVersion {
                found: Some(1),
                minimum: 2,
            }),
        }))
    });

    let outcome = service().import_one(&mut importer, &ImportRequest::new("/in", "a.pmx"));

    assert_eq!(
        outcome,
        ImportOutcome::Failed {
            format: FormatKind::Mmd,
            diagnosis: Diagnosis::UnsupportedVersion {
                format: FormatKind::Mmd,
                found: Some(1),
                minimum: 2,
            },
        }
    );
}

#[test]
fn test_unknown_domain_error_keeps_message() {
    let mut importer = MockImporter::new();
    importer
        .expect_import()
        .times(1)
        .returning(|_| Err(CapabilityError::domain("Corrupt header")));

    let outcome = service().import_one(&mut importer, &ImportRequest::new("/in", "a.fbx"));

    assert_eq!(
        outcome,
        ImportOutcome::Failed {
            format: FormatKind::Fbx,
            diagnosis: Diagnosis::Raw("Corrupt header".to_string()),
        }
    );
}

#[test]
fn test_archives_and_unknown_files_are_not_dispatched() {
    let mut importer = MockImporter::new();
    importer.expect_import().times(0);

    let service = service();
    assert_eq!(
        service.import_one(&mut importer, &ImportRequest::new("/in", "pack.zip")),
        ImportOutcome::Skipped
    );
    assert_eq!(
        service.import_one(&mut importer, &ImportRequest::new("/in", "readme")),
        ImportOutcome::Skipped
    );
}
