mod test_late_watcher_replay;
mod test_offer_last_writer_wins;
