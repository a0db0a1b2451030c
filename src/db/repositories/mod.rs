mod activity_logs;
mod break_anchors;
mod focus_anchors;
mod sessions;
