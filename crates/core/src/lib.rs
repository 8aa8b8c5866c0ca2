pub mod attendance {
    pub mod attendance_report;
    pub mod attendance_session;
}

pub mod config;

pub mod pipeline {
    pub mod embedding_backend;
    pub mod identity_resolver;
    pub mod infrastructure;
    pub mod pipeline_logger;
    pub mod track_attendance_use_case;
}

pub mod recognition {
    pub mod domain {
        pub mod decision_surface;
        pub mod face_embedder;
        pub mod identity;
        pub mod identity_store;
        pub mod similarity;
    }
    pub mod infrastructure;
}

pub mod shared {
    pub mod bounding_box;
    pub mod constants;
    pub mod frame;
    pub mod model_resolver;
    pub mod session_manifest;
}

pub mod tracking {
    pub mod domain {
        pub mod detection;
        pub mod face_detector;
        pub mod track;
    }
    pub mod infrastructure;
}

pub mod video {
    pub mod domain {
        pub mod frame_source;
    }
    pub mod infrastructure;
}
