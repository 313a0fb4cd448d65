#[cfg(test)]
mod tests {
    use crate::{Harness, date, image, image_at, now, smap_image};
    use engine_core::{
        error::SourceError,
        progress::{RunStage, StatusService},
        state::{
            WatermarkStore,
            models::{JournalEntry, RunOutcome},
        },
    };
    use engine_processing::watermark::WatermarkPolicy;
    use engine_runtime::error::RunError;
    use model::{classify::UNKNOWN_LABEL, core::sensor::SensorKind};
    use std::sync::atomic::Ordering;
    use tracing_test::traced_test;

    fn reset_error() -> SourceError {
        SourceError::Provider {
            status: 500,
            message: "computation timed out".into(),
        }
    }

    // Scenario A: empty store, three images with valid means.
    // Expected: one batch of three records, watermark at the newest date,
    // one webhook carrying all three records, one email with the CSV attached.
    #[traced_test]
    #[tokio::test]
    async fn first_run_commits_everything() {
        let harness = Harness::new();
        for (day, mean) in [(3, -15.5), (6, -11.0), (9, -19.2)] {
            harness.source.add(image(day), Some(mean));
        }

        let report = harness
            .driver(WatermarkPolicy::MaxSucceeded)
            .run_once_at(now())
            .await
            .unwrap();

        assert_eq!(report.watermark_before, None);
        assert_eq!(report.new_dates, [date(3), date(6), date(9)]);
        assert_eq!(
            report.outcome,
            RunOutcome::Committed {
                records: 3,
                failed: 0
            }
        );
        assert_eq!(harness.store.last_processed().await.unwrap(), Some(date(9)));

        let webhooks = harness.notifier.webhooks();
        assert_eq!(webhooks.len(), 1);
        assert_eq!(webhooks[0].0, "2025-06-03_2025-06-09");
        assert_eq!(webhooks[0].1.len(), 3);

        let emails = harness.notifier.emails();
        assert_eq!(emails.len(), 1);
        let artifact = emails[0].1.clone().unwrap();
        assert_eq!(
            artifact,
            harness
                .exports_dir()
                .join("2025-06-03_2025-06-09")
                .join("soil_moisture.csv")
        );
        let csv = std::fs::read_to_string(&artifact).unwrap();
        assert_eq!(csv.lines().count(), 4);
        assert!(csv.lines().any(|line| line.starts_with("2025-06-06,-11")));

        for day in [3, 6, 9] {
            let stored = harness.store.load_record(date(day)).await.unwrap().unwrap();
            assert!(stored.record.is_consistent_with(
                &model::classify::ClassificationProfile::sentinel1_vv()
            ));
        }

        assert_eq!(harness.source.exports.lock().unwrap().len(), 3);
        assert!(logs_contain("Batch committed"));
    }

    // Scenario B: watermark at D2, provider still lists D1..D3.
    // Expected: only D3 is extracted and the watermark moves to D3.
    #[tokio::test]
    async fn only_dates_after_watermark_are_processed() {
        let harness = Harness::new();
        harness.store.seed_watermark(date(6)).await;
        for day in [3, 6, 9] {
            harness.source.add(image(day), Some(-12.0));
        }

        let report = harness
            .driver(WatermarkPolicy::MaxSucceeded)
            .run_once_at(now())
            .await
            .unwrap();

        assert_eq!(report.new_dates, [date(9)]);
        assert_eq!(harness.source.reduced(), [image(9).id]);
        assert_eq!(harness.store.last_processed().await.unwrap(), Some(date(9)));
        assert!(harness.store.load_record(date(3)).await.unwrap().is_none());

        // The re-query is restricted to the new span only.
        let queries = harness.source.image_queries.lock().unwrap().clone();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].start, image(9).acquired_at);
        assert_eq!(queries[0].end, image(9).acquired_at);
    }

    // Scenario C: nothing in the lookback window.
    // Expected: clean no-op, no commit, no notification, no image re-query.
    #[traced_test]
    #[tokio::test]
    async fn empty_window_is_a_clean_no_op() {
        let harness = Harness::new();

        let report = harness
            .driver(WatermarkPolicy::MaxSucceeded)
            .run_once_at(now())
            .await
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::NoNewData);
        assert!(report.commit.is_none());
        assert!(harness.notifier.webhooks().is_empty());
        assert!(harness.notifier.emails().is_empty());
        assert!(harness.source.image_queries.lock().unwrap().is_empty());
        assert_eq!(harness.store.last_processed().await.unwrap(), None);
        assert!(logs_contain("No new data"));

        let window = harness.source.timestamp_queries.lock().unwrap()[0];
        assert_eq!(window.end, now());
        assert_eq!(window.start, now() - chrono::Duration::days(15));
    }

    // Scenario D: one reduction has no pixels over the zone.
    // Expected: that record carries no value and the Unknown label, and is
    // still committed with the others.
    #[tokio::test]
    async fn absent_mean_is_committed_as_unknown() {
        let harness = Harness::new();
        harness.source.add(image(3), Some(-15.5));
        harness.source.add(image(6), None);
        harness.source.add(image(9), Some(-8.0));

        let report = harness
            .driver(WatermarkPolicy::MaxSucceeded)
            .run_once_at(now())
            .await
            .unwrap();

        assert_eq!(report.commit.unwrap().records, 3);
        let stored = harness.store.load_record(date(6)).await.unwrap().unwrap();
        assert_eq!(stored.record.value, None);
        assert_eq!(stored.record.label, UNKNOWN_LABEL);

        let csv = std::fs::read_to_string(
            harness
                .exports_dir()
                .join("2025-06-03_2025-06-09")
                .join("soil_moisture.csv"),
        )
        .unwrap();
        assert!(csv.contains("2025-06-06,,Unknown"));
    }

    // Scenario E, default policy: D1 fails, D2 succeeds.
    // Expected: the watermark advances to D2, so D1 is never listed as new
    // again. The status report surfaces D1 as a gap.
    #[traced_test]
    #[tokio::test]
    async fn failed_earlier_date_is_left_behind_by_max_succeeded() {
        let harness = Harness::new();
        harness.source.add_failing(image(3), reset_error());
        harness.source.add(image(6), Some(-10.0));
        let driver = harness.driver(WatermarkPolicy::MaxSucceeded);

        let report = driver.run_once_at(now()).await.unwrap();
        assert_eq!(
            report.outcome,
            RunOutcome::Committed {
                records: 1,
                failed: 1
            }
        );
        assert_eq!(report.failed[0].date, date(3));
        assert_eq!(harness.store.last_processed().await.unwrap(), Some(date(6)));
        assert!(logs_contain("Skipping image"));

        // Even once the provider recovers, D1 is not picked up again.
        harness.source.set_mean(&image(3).id, Some(-14.0));
        let rerun = driver.run_once_at(now()).await.unwrap();
        assert_eq!(rerun.outcome, RunOutcome::NoNewData);
        assert!(harness.store.load_record(date(3)).await.unwrap().is_none());

        let status = StatusService::new(harness.store()).status().await.unwrap();
        assert_eq!(status.watermark, Some(date(6)));
        assert_eq!(status.gaps.len(), 1);
        assert_eq!(status.gaps[0].date, date(3));
        assert_eq!(status.gaps[0].run_id, report.run_id);
        assert_eq!(status.latest_run.unwrap().stage, RunStage::NoNewData);
    }

    // Scenario E, contiguous policy: D1 fails, D2 succeeds.
    // Expected: D2 is stored but the watermark stays below D1, so the next
    // run retries D1 (and overwrites D2).
    #[tokio::test]
    async fn contiguous_policy_retries_failed_date() {
        let harness = Harness::new();
        harness.source.add_failing(image(3), reset_error());
        harness.source.add(image(6), Some(-10.0));
        let driver = harness.driver(WatermarkPolicy::Contiguous);

        let report = driver.run_once_at(now()).await.unwrap();
        assert_eq!(report.commit.unwrap().watermark, None);
        assert!(harness.store.load_record(date(6)).await.unwrap().is_some());

        harness.source.set_mean(&image(3).id, Some(-14.0));
        let rerun = driver.run_once_at(now()).await.unwrap();
        assert_eq!(rerun.new_dates, [date(3), date(6)]);
        assert_eq!(harness.store.last_processed().await.unwrap(), Some(date(6)));
        assert!(harness.store.load_record(date(3)).await.unwrap().is_some());

        let status = StatusService::new(harness.store()).status().await.unwrap();
        assert!(status.gaps.is_empty());
    }

    // The source behaviour: watermark jumps to the newest attempted date even
    // when that very date failed.
    #[tokio::test]
    async fn max_attempted_policy_skips_failed_newest_date() {
        let harness = Harness::new();
        harness.source.add(image(3), Some(-10.0));
        harness.source.add_failing(image(6), reset_error());

        let report = harness
            .driver(WatermarkPolicy::MaxAttempted)
            .run_once_at(now())
            .await
            .unwrap();
        assert_eq!(report.commit.unwrap().watermark, Some(date(6)));
    }

    // Partial failure isolation: image 2 of 3 fails.
    // Expected: exactly two records are committed and the run succeeds.
    #[tokio::test]
    async fn one_failed_image_does_not_abort_the_run() {
        let harness = Harness::new();
        harness.source.add(image(3), Some(-15.0));
        harness
            .source
            .add_failing(image(6), SourceError::Unauthorized("token expired".into()));
        harness.source.add(image(9), Some(-7.0));

        let report = harness
            .driver(WatermarkPolicy::MaxSucceeded)
            .run_once_at(now())
            .await
            .unwrap();

        assert_eq!(report.commit.as_ref().unwrap().records, 2);
        assert_eq!(harness.notifier.webhooks()[0].1.len(), 2);

        let journal = harness.store.run_journal(&report.run_id).await.unwrap();
        assert!(matches!(journal.first(), Some(JournalEntry::RunStart { .. })));
        assert!(matches!(journal.last(), Some(JournalEntry::RunFinished { .. })));
        assert_eq!(
            journal
                .iter()
                .filter(|e| matches!(e, JournalEntry::ImageFailed { .. }))
                .count(),
            1
        );
    }

    // Every image fails: no partial state is persisted and nobody is notified.
    #[traced_test]
    #[tokio::test]
    async fn nothing_extracted_skips_commit() {
        let harness = Harness::new();
        harness.source.add_failing(image(3), reset_error());
        harness.source.add_failing(image(6), reset_error());

        let report = harness
            .driver(WatermarkPolicy::MaxSucceeded)
            .run_once_at(now())
            .await
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::NothingExtracted { failed: 2 });
        assert_eq!(harness.store.last_processed().await.unwrap(), None);
        assert!(harness.notifier.webhooks().is_empty());
        assert!(harness.notifier.emails().is_empty());
        assert!(!harness.exports_dir().exists());
        assert!(logs_contain("No records extracted"));
    }

    // Idempotence: a second run over the same provider state is a no-op and
    // leaves the stored rows untouched.
    #[tokio::test]
    async fn rerun_after_commit_changes_nothing() {
        let harness = Harness::new();
        harness.source.add(image(3), Some(-15.0));
        harness.source.add(image(6), Some(-9.0));
        let driver = harness.driver(WatermarkPolicy::MaxSucceeded);

        driver.run_once_at(now()).await.unwrap();
        let before = harness.store.history(10).await.unwrap();

        let rerun = driver.run_once_at(now()).await.unwrap();
        assert_eq!(rerun.outcome, RunOutcome::NoNewData);
        assert_eq!(harness.store.history(10).await.unwrap(), before);
        assert_eq!(harness.notifier.webhooks().len(), 1);
    }

    // Restart resumability: a new process picks up from the persisted
    // watermark and only extracts what arrived since.
    #[tokio::test]
    async fn resumes_from_persisted_watermark_after_restart() {
        let harness = Harness::new();
        harness.source.add(image(3), Some(-15.0));
        harness.source.add(image(6), Some(-9.0));
        let driver = harness.driver(WatermarkPolicy::MaxSucceeded);
        driver.run_once_at(now()).await.unwrap();
        drop(driver);

        let harness = harness.restart();
        harness.source.add(image(9), Some(-6.0));
        let report = harness
            .driver(WatermarkPolicy::MaxSucceeded)
            .run_once_at(now())
            .await
            .unwrap();

        assert_eq!(report.watermark_before, Some(date(6)));
        assert_eq!(report.new_dates, [date(9)]);
        assert_eq!(harness.store.last_processed().await.unwrap(), Some(date(9)));
        assert_eq!(harness.store.history(10).await.unwrap().len(), 3);
    }

    // Persistence error: the commit fails after notifications went out.
    // Expected: the run errors, the watermark is unchanged, and the next run
    // recomputes and commits the same delta.
    #[tokio::test]
    async fn failed_commit_is_retried_by_next_run() {
        let harness = Harness::new();
        harness.source.add(image(3), Some(-15.0));
        harness.source.add(image(6), Some(-9.0));
        harness.store.fail_next_commits(1);
        let driver = harness.driver(WatermarkPolicy::MaxSucceeded);

        let err = driver.run_once_at(now()).await.unwrap_err();
        assert!(matches!(err, RunError::Commit(_)));
        assert!(!err.is_fatal());
        assert_eq!(harness.store.last_processed().await.unwrap(), None);
        assert_eq!(harness.notifier.webhooks().len(), 1);

        let status = StatusService::new(harness.store()).status().await.unwrap();
        let latest = status.latest_run.unwrap();
        assert_eq!(latest.stage, RunStage::Failed);
        assert!(latest.error.unwrap().contains("simulated write failure"));

        let retry = driver.run_once_at(now()).await.unwrap();
        assert_eq!(retry.new_dates, [date(3), date(6)]);
        assert_eq!(harness.store.last_processed().await.unwrap(), Some(date(6)));
        // Notification is at-least-once across a failed commit.
        assert_eq!(harness.notifier.webhooks().len(), 2);
    }

    // Images come back newest first; extraction still runs oldest first.
    #[tokio::test]
    async fn processes_in_ascending_order_regardless_of_listing_order() {
        let harness = Harness::new();
        for day in [9, 3, 6] {
            harness.source.add(image(day), Some(-12.0));
        }
        harness.source.reverse_listing.store(true, Ordering::SeqCst);

        harness
            .driver(WatermarkPolicy::MaxSucceeded)
            .run_once_at(now())
            .await
            .unwrap();

        assert_eq!(
            harness.source.reduced(),
            [image(3).id, image(6).id, image(9).id]
        );
        let records = &harness.notifier.webhooks()[0].1;
        assert!(records.windows(2).all(|w| w[0].date < w[1].date));
    }

    // Listing outside the lookback window is ignored entirely.
    #[tokio::test]
    async fn images_older_than_lookback_are_ignored() {
        let harness = Harness::new();
        harness.source.add(
            model::core::image::ImageRef::new(
                "COPERNICUS/S1_GRD/OLD",
                now() - chrono::Duration::days(20),
            ),
            Some(-12.0),
        );
        harness.source.add(image(9), Some(-12.0));

        let report = harness
            .driver(WatermarkPolicy::MaxSucceeded)
            .run_once_at(now())
            .await
            .unwrap();
        assert_eq!(report.new_dates, [date(9)]);
    }

    // A listing failure fails the run without touching the store.
    #[tokio::test]
    async fn listing_failure_is_a_non_fatal_run_error() {
        let harness = Harness::new();
        harness.source.add(image(3), Some(-12.0));
        harness.source.fail_listing.store(true, Ordering::SeqCst);

        let err = harness
            .driver(WatermarkPolicy::MaxSucceeded)
            .run_once_at(now())
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Listing(ref e) if e.is_transient()));
        assert!(!err.is_fatal());
        assert_eq!(harness.store.last_processed().await.unwrap(), None);
    }

    // The run report is what `soilwatch run --json` prints.
    #[tokio::test]
    async fn run_report_serializes_for_operators() {
        let harness = Harness::new();
        harness.source.add(image(3), Some(-15.5));

        let report = harness
            .driver(WatermarkPolicy::MaxSucceeded)
            .run_once_at(now())
            .await
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["run_id"], report.run_id.as_str());
        assert_eq!(json["new_dates"][0], "2025-06-03");
        assert_eq!(json["outcome"]["Committed"]["records"], 1);
        assert_eq!(json["commit"]["batch_id"], "2025-06-03_2025-06-03");
        assert_eq!(report.watermark_after(), Some(date(3)));
    }

    // Scenario: two acquisitions on June 3 both reduce successfully.
    // Expected Outcome: one record for the date, carrying the later
    // acquisition's value, since images run in time order and the last
    // record for a date wins.
    #[tokio::test]
    async fn same_date_images_collapse_to_latest_acquisition() {
        let harness = Harness::new();
        harness.source.add(image_at(3, 18), Some(-9.0));
        harness.source.add(image_at(3, 6), Some(-20.0));

        let report = harness
            .driver(WatermarkPolicy::MaxSucceeded)
            .run_once_at(now())
            .await
            .unwrap();

        assert_eq!(report.new_dates, [date(3)]);
        assert_eq!(
            harness.source.reduced(),
            [image_at(3, 6).id, image_at(3, 18).id]
        );
        assert_eq!(report.commit.as_ref().unwrap().records, 1);
        let webhooks = harness.notifier.webhooks();
        assert_eq!(webhooks[0].1.len(), 1);
        assert_eq!(webhooks[0].1[0].value, Some(-9.0));

        let stored = harness.store.load_record(date(3)).await.unwrap().unwrap();
        assert_eq!(stored.record.value, Some(-9.0));
        assert_eq!(harness.store.last_processed().await.unwrap(), Some(date(3)));
    }

    // Scenario: June 3 has one failing and one good acquisition, June 6 is good.
    // Expected Outcome: under max-succeeded both dates are stored, the
    // watermark reaches June 6, and June 3 is not a gap because it has a row.
    #[tokio::test]
    async fn partially_failed_date_still_counts_under_max_succeeded() {
        let harness = Harness::new();
        harness.source.add_failing(image_at(3, 6), reset_error());
        harness.source.add(image_at(3, 18), Some(-10.0));
        harness.source.add(image(6), Some(-12.0));

        let report = harness
            .driver(WatermarkPolicy::MaxSucceeded)
            .run_once_at(now())
            .await
            .unwrap();

        assert_eq!(
            report.outcome,
            RunOutcome::Committed {
                records: 2,
                failed: 1
            }
        );
        assert_eq!(harness.store.last_processed().await.unwrap(), Some(date(6)));
        assert!(harness.store.load_record(date(3)).await.unwrap().is_some());

        let status = StatusService::new(harness.store()).status().await.unwrap();
        assert!(status.gaps.is_empty());
    }

    // Scenario: same inputs under the contiguous policy.
    // Expected Outcome: June 3 counts as failed because one of its images
    // failed, so the watermark holds; the next run retries both dates and
    // advances once the failing acquisition recovers.
    #[tokio::test]
    async fn partially_failed_date_holds_contiguous_watermark() {
        let harness = Harness::new();
        harness.source.add_failing(image_at(3, 6), reset_error());
        harness.source.add(image_at(3, 18), Some(-10.0));
        harness.source.add(image(6), Some(-12.0));
        let driver = harness.driver(WatermarkPolicy::Contiguous);

        let report = driver.run_once_at(now()).await.unwrap();
        assert_eq!(report.commit.unwrap().watermark, None);
        assert!(harness.store.load_record(date(3)).await.unwrap().is_some());
        assert!(harness.store.load_record(date(6)).await.unwrap().is_some());

        harness.source.set_mean(&image_at(3, 6).id, Some(-11.0));
        let retry = driver.run_once_at(now()).await.unwrap();
        assert_eq!(retry.new_dates, [date(3), date(6)]);
        assert!(retry.failed.is_empty());
        assert_eq!(harness.store.last_processed().await.unwrap(), Some(date(6)));

        // The later acquisition of June 3 still wins over the recovered one.
        let stored = harness.store.load_record(date(3)).await.unwrap().unwrap();
        assert_eq!(stored.record.value, Some(-10.0));
    }

    // Scenario: a SMAP run over two days of 3-hourly granules.
    // Expected Outcome: one record per day classified with the volumetric
    // profile, the SMAP CSV column, and SMAP export naming.
    #[tokio::test]
    async fn smap_run_uses_smap_profile_column_and_naming() {
        let harness = Harness::new();
        for hour in [1, 4, 7] {
            harness.source.add(smap_image(3, hour), Some(0.04));
        }
        harness.source.add(smap_image(4, 1), Some(0.25));

        let report = harness
            .driver_for(SensorKind::Smap, WatermarkPolicy::MaxSucceeded)
            .run_once_at(now())
            .await
            .unwrap();

        assert_eq!(report.commit.as_ref().unwrap().records, 2);
        assert_eq!(harness.source.reduced().len(), 4);

        let stored = harness.store.load_record(date(4)).await.unwrap().unwrap();
        assert_eq!(stored.record.label, "4 – Moderately Moist");
        let stored = harness.store.load_record(date(3)).await.unwrap().unwrap();
        assert_eq!(stored.record.label, "1 – Very Dry");

        let csv = std::fs::read_to_string(
            harness
                .exports_dir()
                .join("2025-06-03_2025-06-04")
                .join("soil_moisture.csv"),
        )
        .unwrap();
        assert_eq!(csv.lines().next(), Some("date,vv_dB,description"));
        assert_eq!(csv.lines().count(), 3);

        let exports = harness.source.exports.lock().unwrap().clone();
        assert_eq!(exports.len(), 4);
        assert!(
            exports
                .iter()
                .all(|e| e.file_prefix.starts_with("smap_soil_moisture_2025-06-0"))
        );
        assert_eq!(exports[3].file_prefix, "smap_soil_moisture_2025-06-04");
        assert_eq!(exports[3].scale, SensorKind::Smap.scale());
    }
}
