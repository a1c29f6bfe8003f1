//! Starter knowledge base for a fresh install.
//!
//! Seeding is idempotent: documents are matched by title and FAQs by
//! question, and existing records are left untouched.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use sage_core::error::SageError;

use crate::db::Database;
use crate::repository::{DocumentRepository, FaqRepository};

struct SeedDocument {
    title: &'static str,
    content: &'static str,
    category: &'static str,
}

struct SeedFaq {
    question: &'static str,
    answer: &'static str,
    category: &'static str,
}

const DOCUMENTS: &[SeedDocument] = &[
    SeedDocument {
        title: "Getting Started with LMS Platform",
        content: "Welcome to our Learning Management System! To get started:
1. Create an account or log in
2. Browse available courses in the catalog
3. Enroll in courses that interest you
4. Access course materials from your dashboard
5. Complete quizzes and assignments to track progress
6. Earn certificates upon course completion",
        category: "Getting Started",
    },
    SeedDocument {
        title: "Course Enrollment Process",
        content: "To enroll in a course:
1. Browse the course catalog
2. Click on a course to view details
3. Click \"Enroll\" or \"Add to Cart\" for paid courses
4. Complete payment if required
5. Access your enrolled courses from the Dashboard
Note: Some courses may have prerequisites or enrollment limits.",
        category: "Courses",
    },
    SeedDocument {
        title: "Certificate Information",
        content: "Certificates are awarded upon successful course completion:
- Complete all required lessons and modules
- Pass all quizzes with minimum score (usually 70%)
- Submit all required assignments
- Certificates can be downloaded from your profile
- Certificates include your name, course title, and completion date
- Share certificates on LinkedIn or download as PDF",
        category: "Certificates",
    },
    SeedDocument {
        title: "Payment and Refund Policy",
        content: "Payment Information:
- We accept credit cards, debit cards, and digital wallets
- Payments are processed securely via Stripe
- Invoices are available in your account

Refund Policy:
- Full refund within 7 days of purchase if no content accessed
- Partial refund (50%) within 14 days
- No refund after 14 days or if more than 50% content completed
- Contact support for refund requests",
        category: "Payments",
    },
    SeedDocument {
        title: "Technical Requirements",
        content: "System Requirements:
- Modern web browser (Chrome, Firefox, Safari, Edge)
- Stable internet connection (minimum 5 Mbps recommended)
- JavaScript enabled
- For video content: HTML5 video support
- Mobile: iOS 12+ or Android 8+

Troubleshooting:
- Clear browser cache if experiencing issues
- Disable ad blockers for best experience
- Check internet connection for video buffering",
        category: "Technical",
    },
];

const FAQS: &[SeedFaq] = &[
    SeedFaq {
        question: "How do I reset my password?",
        answer: "Click \"Forgot Password\" on the login page, enter your email, and follow the instructions sent to your inbox. The reset link expires in 24 hours.",
        category: "Account",
    },
    SeedFaq {
        question: "Can I access courses on mobile devices?",
        answer: "Yes! Our platform is fully responsive and works on smartphones and tablets. You can access all course materials through your mobile browser.",
        category: "Technical",
    },
    SeedFaq {
        question: "How long do I have access to a course after enrollment?",
        answer: "Once enrolled, you have lifetime access to the course materials. You can revisit content anytime, even after completion.",
        category: "Courses",
    },
    SeedFaq {
        question: "What happens if I fail a quiz?",
        answer: "You can retake quizzes multiple times. Your highest score will be recorded. Review the course material before retaking for better results.",
        category: "Quizzes",
    },
    SeedFaq {
        question: "How do I contact support?",
        answer: "Visit the Contact page or email support@lmsplatform.com. Our support team typically responds within 24-48 hours during business days.",
        category: "Support",
    },
    SeedFaq {
        question: "Can I get a refund for a course?",
        answer: "Yes, we offer full refunds within 7 days of purchase if you haven't accessed more than 10% of the content. Contact support for refund requests.",
        category: "Payments",
    },
    SeedFaq {
        question: "How do I download my certificate?",
        answer: "Go to Dashboard > Certificates, find your completed course, and click \"Download Certificate\". You can download as PDF or share directly to LinkedIn.",
        category: "Certificates",
    },
    SeedFaq {
        question: "Are the certificates recognized by employers?",
        answer: "Our certificates demonstrate skill completion and can be shared with employers. Each certificate has a unique verification code that employers can verify.",
        category: "Certificates",
    },
];

/// Outcome of a seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub documents_created: usize,
    pub documents_existing: usize,
    pub faqs_created: usize,
    pub faqs_existing: usize,
}

impl SeedReport {
    pub fn created(&self) -> usize {
        self.documents_created + self.faqs_created
    }
}

/// Insert the starter documents and FAQs that are not present yet.
pub fn seed_knowledge_base(db: Arc<Database>) -> Result<SeedReport, SageError> {
    let documents = DocumentRepository::new(db.clone());
    let faqs = FaqRepository::new(db);
    let mut report = SeedReport::default();

    for seed in DOCUMENTS {
        if documents.find_by_title(seed.title)?.is_some() {
            debug!(title = seed.title, "Document exists");
            report.documents_existing += 1;
        } else {
            documents.create(seed.title, seed.content, seed.category)?;
            debug!(title = seed.title, "Created document");
            report.documents_created += 1;
        }
    }

    for seed in FAQS {
        if faqs.find_by_question(seed.question)?.is_some() {
            debug!(question = seed.question, "FAQ exists");
            report.faqs_existing += 1;
        } else {
            faqs.create(seed.question, seed.answer, seed.category)?;
            debug!(question = seed.question, "Created FAQ");
            report.faqs_created += 1;
        }
    }

    info!(
        created = report.created(),
        documents_created = report.documents_created,
        faqs_created = report.faqs_created,
        "Knowledge base seeded"
    );
    Ok(report)
}
